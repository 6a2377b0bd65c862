//! Kinematic контроллер + headless navigation driver
//!
//! Архитектура:
//! - Rapier для коллизий (RigidBody::KinematicPositionBased в engine билде)
//! - Custom velocity integration (не используем Rapier forces)
//! - NavigationAgent ведётся по прямой — stand-in вместо navmesh'а,
//!   контракт для AI тот же

use bevy::prelude::*;
use bevy_rapier3d::prelude::Velocity;

use crate::ai::stuck::StuckWindow;
use crate::components::{MovementCommand, NavigationAgent};

/// Физическое тело агента (velocity + constraint флаг)
///
/// Exclusive ownership: мутирует только контроллер агента; внешние
/// collaborator'ы сигналят событиями.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct PhysicsBody {
    pub velocity: Vec3,
    /// Замороженное тело игнорирует импульсы и интеграцию
    pub frozen: bool,
}

impl PhysicsBody {
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if !self.frozen {
            self.velocity += impulse;
        }
    }

    /// SetConstraints контракт: freeze = полная фиксация тела
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
        if frozen {
            self.velocity = Vec3::ZERO;
        }
    }
}

/// Kinematic контроллер компонент (gravity + ground check)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct KinematicController {
    /// Сила гравитации (м/с²)
    pub gravity: f32,
    /// На земле ли персонаж
    pub grounded: bool,
}

impl Default for KinematicController {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            grounded: false,
        }
    }
}

/// Система: navigation driver
///
/// Конвертирует MovementCommand → NavigationAgent destination и ведёт тело
/// по прямой. Escape boost от StuckDetector умножает скорость.
pub fn navigation_drive(
    mut query: Query<(
        &MovementCommand,
        &mut NavigationAgent,
        &mut PhysicsBody,
        &Transform,
        Option<&StuckWindow>,
    )>,
    targets: Query<&Transform>,
) {
    for (command, mut nav, mut body, transform, stuck) in query.iter_mut() {
        match command {
            MovementCommand::Idle => {
                // Не трогаем destination
            }
            MovementCommand::MoveToPosition { target } => {
                nav.set_destination(*target);
            }
            MovementCommand::FollowEntity { target } => {
                if let Ok(target_transform) = targets.get(*target) {
                    nav.set_destination(target_transform.translation);
                } else {
                    nav.clear_destination();
                }
            }
            MovementCommand::Stop => {
                nav.clear_destination();
                body.velocity.x = 0.0;
                body.velocity.z = 0.0;
            }
        }

        if !nav.enabled || body.frozen {
            nav.velocity = Vec3::ZERO;
            continue;
        }

        if nav.is_stopped {
            body.velocity.x = 0.0;
            body.velocity.z = 0.0;
            nav.velocity = Vec3::ZERO;
            continue;
        }

        let Some(destination) = nav.destination else {
            nav.velocity = body.velocity;
            continue;
        };

        let to_destination = destination - transform.translation;
        let flat = Vec3::new(to_destination.x, 0.0, to_destination.z);

        if flat.length() > nav.arrive_radius {
            let boost = stuck
                .and_then(|window| window.escape_speed_mult())
                .unwrap_or(1.0);
            let direction = flat.normalize();
            body.velocity.x = direction.x * nav.speed * boost;
            body.velocity.z = direction.z * nav.speed * boost;
        } else {
            // Прибыли
            body.velocity.x = 0.0;
            body.velocity.z = 0.0;
        }

        nav.velocity = body.velocity;
    }
}

/// Система применения gravity к velocity
pub fn apply_gravity(
    mut query: Query<(&KinematicController, &mut PhysicsBody)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (controller, mut body) in query.iter_mut() {
        if !controller.grounded && !body.frozen {
            body.velocity.y += controller.gravity * delta;
        }
    }
}

/// Система интеграции velocity → position
///
/// Тело разворачиваем по горизонтальному направлению движения — perception
/// forward следует за локомоцией.
pub fn integrate_velocity(
    mut query: Query<(&PhysicsBody, &mut Transform)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (body, mut transform) in query.iter_mut() {
        if body.frozen {
            continue;
        }

        transform.translation += body.velocity * delta;

        // Пол на y=0 (стены/рельеф — external collision collaborator)
        if transform.translation.y < 0.0 {
            transform.translation.y = 0.0;
        }

        let flat_velocity = Vec3::new(body.velocity.x, 0.0, body.velocity.z);
        if flat_velocity.length() > 0.1 {
            transform.look_to(flat_velocity.normalize(), Vec3::Y);
        }
    }
}

/// Система ground detection через простую Y-проверку
///
/// TODO: заменить на raycast через RapierContext в engine билде
pub fn ground_detection(mut query: Query<(&Transform, &mut KinematicController, &mut PhysicsBody)>) {
    for (transform, mut controller, mut body) in query.iter_mut() {
        controller.grounded = transform.translation.y <= 0.05;
        if controller.grounded && body.velocity.y < 0.0 {
            body.velocity.y = 0.0;
        }
    }
}

/// Система синхронизации PhysicsBody.velocity → Rapier Velocity
///
/// Rapier применяет velocity к KinematicPositionBased телам в engine билде.
pub fn sync_velocity_to_rapier(mut query: Query<(&PhysicsBody, &mut Velocity)>) {
    for (body, mut rapier_velocity) in query.iter_mut() {
        rapier_velocity.linvel = body.velocity;
    }
}
