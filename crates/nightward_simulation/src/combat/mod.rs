//! Combat system module
//!
//! ECS ответственность:
//! - Game state: Health, panel array, charge ability
//! - Combat rules: charge контакты, panel латчи, explosion falloff
//! - События: DamageDealt, EntityDied, CushionImpact, PanelsDepleted
//!
//! Engine bridge ответственность:
//! - Trigger volumes / collision detection → ChargeContact, PanelHit
//! - VFX/анимации по исходящим событиям

use bevy::prelude::*;

pub mod charge;
pub mod damage;
pub mod explosion;
pub mod panels;

// Re-export основных типов
pub use charge::{
    begin_charge, ChargeAbility, ChargeConfig, ChargeContact, ChargeState, ChargeTarget,
    ContactSurface, CushionImpact, MAX_CONSECUTIVE_COLLISIONS,
};
pub use damage::{DamageDealt, DamageRampage, DamageType, Dead, EntityDied};
pub use explosion::{Exploded, ExplosionSpec, ExplosionTriggered};
pub use panels::{Panel, PanelArray, PanelDamage, PanelHit, PanelsDepleted};

use crate::SimulationSet;

/// Combat Plugin
///
/// Порядок выполнения (FixedUpdate):
/// 1. drive_charges — ramp вдоль залоченного вектора (Locomotion set)
/// 2. tick_charge_cooldowns → process_charge_contacts →
///    process_panel_hits → apply_rampage_damage → detonate_exploding →
///    handle_entity_death (Combat set, chain)
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .add_event::<DamageRampage>()
            .add_event::<ChargeContact>()
            .add_event::<CushionImpact>()
            .add_event::<PanelHit>()
            .add_event::<PanelsDepleted>()
            .add_event::<ExplosionTriggered>();

        app.add_systems(
            FixedUpdate,
            charge::drive_charges
                .in_set(SimulationSet::Locomotion)
                .after(crate::physics::navigation_drive),
        );

        app.add_systems(
            FixedUpdate,
            (
                charge::tick_charge_cooldowns,
                charge::process_charge_contacts,
                panels::process_panel_hits,
                damage::apply_rampage_damage,
                explosion::detonate_exploding,
                damage::handle_entity_death,
            )
                .chain()
                .in_set(SimulationSet::Combat),
        );
    }
}
