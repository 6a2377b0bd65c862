//! Physics simulation module
//!
//! Kinematic контроллер + navigation driver. Rapier для коллизий
//! (engine-backed билд), velocity интегрируем сами — headless билд
//! полностью самодостаточен.

pub mod movement;

// Re-export основных типов
pub use movement::{
    apply_gravity, ground_detection, integrate_velocity, navigation_drive,
    sync_velocity_to_rapier, KinematicController, PhysicsBody,
};

use crate::SimulationSet;
use bevy::prelude::*;

/// Physics Plugin
///
/// Порядок выполнения (FixedUpdate):
/// 1. navigation_drive — MovementCommand → velocity (Locomotion set)
/// 2. apply_gravity → integrate_velocity → ground_detection →
///    sync_velocity_to_rapier (Physics set)
pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            navigation_drive.in_set(SimulationSet::Locomotion),
        );
        app.add_systems(
            FixedUpdate,
            (
                apply_gravity,
                integrate_velocity,
                ground_detection,
                sync_velocity_to_rapier,
            )
                .chain()
                .in_set(SimulationSet::Physics),
        );
    }
}
