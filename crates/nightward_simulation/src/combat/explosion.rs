//! Explosion subsystem: one-shot терминальная детонация
//!
//! Один идемпотентный проход по damageable entities в радиусе: сила с
//! обратным масштабом от дистанции, урон — линейная интерполяция
//! max→min. Повторный вход в Exploding (форсированный) подавляется
//! маркером Exploded.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::components::AgentState;
use crate::combat::damage::{DamageDealt, DamageType, EntityDied};
use crate::components::{Health, RampageConfig};
use crate::physics::PhysicsBody;
use crate::rampage::Rampage;
use crate::services::{cues, AudioChannel};

/// Read-only параметры взрыва (конфиг, потребляется один раз)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplosionSpec {
    pub damage_radius: f32,
    pub force_radius: f32,
    /// Урон на нулевой дистанции
    pub max_damage: u32,
    /// Урон на границе damage_radius
    pub min_damage: u32,
    /// Импульс на нулевой дистанции (м/с)
    pub force: f32,
}

impl Default for ExplosionSpec {
    fn default() -> Self {
        Self {
            damage_radius: 8.0,
            force_radius: 10.0,
            max_damage: 50,
            min_damage: 10,
            force: 12.0,
        }
    }
}

/// Маркер: агент уже сдетонировал (idempotence guard на уровне контроллера)
#[derive(Component, Debug, Default)]
pub struct Exploded;

/// Событие для VFX/audio collaborator'ов
#[derive(Event, Debug, Clone)]
pub struct ExplosionTriggered {
    pub agent: Entity,
    pub position: Vec3,
}

/// Урон на дистанции d: линейная интерполяция max→min по damage_radius
pub fn damage_at(spec: &ExplosionSpec, distance: f32) -> u32 {
    let t = (distance / spec.damage_radius).clamp(0.0, 1.0);
    let max = spec.max_damage as f32;
    let min = spec.min_damage as f32;
    (max + (min - max) * t).round() as u32
}

/// Импульс на дистанции d: force на нуле, ноль на границе force_radius
pub fn force_at(spec: &ExplosionSpec, distance: f32) -> f32 {
    let t = (distance / spec.force_radius).clamp(0.0, 1.0);
    spec.force * (1.0 - t)
}

/// Система: детонация агентов в Exploding
///
/// Ровно один проход на взрыв; повторный вход логируется и подавляется.
pub fn detonate_exploding(
    mut commands: Commands,
    agents: Query<(Entity, &AgentState, &Transform, &RampageConfig, Option<&Exploded>), With<Rampage>>,
    mut targets: Query<(Entity, &Transform, &mut Health, Option<&mut PhysicsBody>), Without<Rampage>>,
    audio: Res<AudioChannel>,
    mut triggered_events: EventWriter<ExplosionTriggered>,
    mut damage_events: EventWriter<DamageDealt>,
    mut died_events: EventWriter<EntityDied>,
) {
    for (agent, state, transform, config, exploded) in agents.iter() {
        if !matches!(state, AgentState::Exploding) {
            continue;
        }
        if exploded.is_some() {
            crate::log(&format!(
                "Explosion: {:?} re-entered Exploding, pass suppressed",
                agent
            ));
            continue;
        }

        let spec = &config.explosion;
        let origin = transform.translation;

        for (target, target_transform, mut target_health, target_body) in targets.iter_mut() {
            let offset = target_transform.translation - origin;
            let distance = offset.length();

            if distance <= spec.force_radius {
                if let Some(mut target_body) = target_body {
                    // На нулевой дистанции направление не определено — вверх
                    let direction = if distance < 1e-4 {
                        Vec3::Y
                    } else {
                        offset / distance
                    };
                    target_body.apply_impulse(direction * force_at(spec, distance));
                }
            }

            if distance <= spec.damage_radius {
                let damage = damage_at(spec, distance);
                let was_alive = target_health.is_alive();
                target_health.take_damage(damage);
                let target_died = was_alive && !target_health.is_alive();

                damage_events.write(DamageDealt {
                    attacker: agent,
                    target,
                    damage,
                    damage_type: DamageType::Explosion,
                    target_died,
                });
                if target_died {
                    died_events.write(EntityDied {
                        entity: target,
                        killer: Some(agent),
                    });
                }
            }
        }

        audio.one_shot(cues::EXPLOSION, origin);
        triggered_events.write(ExplosionTriggered {
            agent,
            position: origin,
        });
        died_events.write(EntityDied {
            entity: agent,
            killer: None,
        });
        commands.entity(agent).insert(Exploded);

        crate::log_info(&format!("Explosion: {:?} detonated at {:?}", agent, origin));
    }
}
