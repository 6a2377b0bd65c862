//! Rampage agent composition root
//!
//! Никакого наследования: «вид» врага = конфиг + набор состояний поверх
//! общих стратегий (perception, decision, locomotion). Спавн собирает все
//! компоненты на один entity — он единственный владелец своего mutable
//! state (§ concurrency model).

use bevy::prelude::*;
use bevy_rapier3d::prelude::{Collider, Velocity};

use crate::ai::components::{AgentState, StateMachine};
use crate::ai::stuck::StuckWindow;
use crate::combat::charge::ChargeAbility;
use crate::combat::panels::PanelArray;
use crate::components::{Actor, Health, MovementCommand, NavigationAgent, RampageConfig};
use crate::perception::{PerceptionSnapshot, TrackedTarget};
use crate::physics::{KinematicController, PhysicsBody};

/// Маркер Rampage агента
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct Rampage;

/// Спавнит Rampage агента со всеми подсистемами
///
/// Конфиг клонируется на entity (read-only asset); Vision берётся из него.
pub fn spawn_rampage(
    commands: &mut Commands,
    config: RampageConfig,
    position: Vec3,
    faction_id: u64,
) -> Entity {
    let vision = config.vision.clone();
    let health = Health::new(config.core_hp);
    let panels = PanelArray::new(config.panels_total);
    let nav = NavigationAgent::new(config.move_speed);

    let entity = commands
        .spawn((
            (Rampage, Actor { faction_id }, health),
            (
                AgentState::default(),
                StateMachine::default(),
                vision,
                PerceptionSnapshot::default(),
                TrackedTarget::default(),
                StuckWindow::default(),
                ChargeAbility::default(),
            ),
            (panels, config),
            (
                MovementCommand::Idle,
                nav,
                PhysicsBody::default(),
                KinematicController::default(),
            ),
            (
                Transform::from_translation(position),
                Collider::capsule_y(1.2, 0.8),
                Velocity::default(),
            ),
        ))
        .id();

    crate::log_info(&format!(
        "Rampage: spawned {:?} at {:?} (faction {})",
        entity, position, faction_id
    ));

    entity
}
