//! Charge attack subsystem: залоченный вектор + ramp + контакты
//!
//! Commit-семантика: begin_charge() нормализует направление на цель ровно
//! один раз, и оно НЕ пересчитывается до конца charge'а — телеграфированная,
//! уворачиваемая атака. Контакты приходят событиями от collision
//! collaborator'а; каждый исход залатчен на один раз за charge.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::components::{AgentState, StateMachine};
use crate::ai::events::StateChanged;
use crate::ai::machine::change_state;
use crate::ai::stuck::StuckWindow;
use crate::combat::damage::{DamageDealt, DamageType, EntityDied};
use crate::combat::panels::PanelArray;
use crate::components::{Health, NavigationAgent, RampageConfig};
use crate::physics::PhysicsBody;
use crate::rampage::Rampage;
use crate::services::{cues, AudioChannel};

/// Подряд идущие столкновения, после которых оригинальный recovery должен
/// был срабатывать. Счётчик намеренно инертен — recovery-on-repeated-
/// collision отключён продуктовым решением, оставлен только лог.
pub const MAX_CONSECUTIVE_COLLISIONS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeConfig {
    /// Casting time замаха по времени суток (секунды)
    pub windup_morning: f32,
    pub windup_afternoon: f32,
    /// Cooldown между charge'ами по времени суток (секунды)
    pub cooldown_morning: f32,
    pub cooldown_afternoon: f32,
    /// Максимальная скорость charge'а (м/с)
    pub target_speed: f32,
    /// Разгон (м/с²)
    pub acceleration: f32,
    /// Торможение после перелёта target point (м/с²)
    pub deceleration: f32,
    /// Скорость ниже которой charge считается исчерпанным (м/с)
    pub stop_speed_threshold: f32,
    /// Жёсткий потолок длительности charge'а (секунды)
    pub max_duration: f32,
    /// Урон по цели при таране
    pub rush_damage: u32,
    /// Импульс knockback'а по цели (м/с)
    pub knockback: f32,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            windup_morning: 0.9,
            windup_afternoon: 0.6,
            cooldown_morning: 6.0,
            cooldown_afternoon: 4.0,
            target_speed: 14.0,
            acceleration: 28.0,
            deceleration: 35.0,
            stop_speed_threshold: 1.0,
            max_duration: 3.0,
            rush_damage: 25,
            knockback: 9.0,
        }
    }
}

/// Залоченный charge вектор
///
/// direction фиксируется в begin_charge() и не меняется до конца charge'а.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct ChargeTarget {
    pub start_position: Vec3,
    /// Unit вектор, горизонтальный
    pub direction: Vec3,
    pub target_point: Vec3,
    pub current_speed: f32,
    pub target_speed: f32,
}

/// Лочит charge вектор: нормализованное направление agent→target на момент
/// вызова. Fallback при совпадающих точках — -Z (никогда не NaN).
pub fn begin_charge(
    agent_position: Vec3,
    target_position: Vec3,
    config: &ChargeConfig,
) -> ChargeTarget {
    let mut to_target = target_position - agent_position;
    to_target.y = 0.0;
    let direction = to_target.normalize_or_zero();
    let direction = if direction == Vec3::ZERO {
        Vec3::NEG_Z
    } else {
        direction
    };

    ChargeTarget {
        start_position: agent_position,
        direction,
        target_point: target_position,
        current_speed: 0.0,
        target_speed: config.target_speed,
    }
}

/// Состояние активного charge'а (живёт внутри AgentState::Charging,
/// уничтожается переходом)
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct ChargeState {
    pub target: ChargeTarget,
    pub elapsed: f32,
    /// Перелетели target point — тормозим
    pub overran: bool,
    /// Латч: урон по цели один раз за charge
    pub rush_damage_dealt: bool,
    /// Латч: HP потеря от стены один раз за charge
    pub wall_hit: bool,
    /// Контакт был поглощён cushion'ом
    pub cushion_hit: bool,
}

impl ChargeState {
    pub fn new(target: ChargeTarget) -> Self {
        Self {
            target,
            elapsed: 0.0,
            overran: false,
            rush_damage_dealt: false,
            wall_hit: false,
            cushion_hit: false,
        }
    }
}

/// Способность charge'а: cooldown + инертный счётчик коллизий
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct ChargeAbility {
    pub cooldown_timer: f32,
    /// См. MAX_CONSECUTIVE_COLLISIONS
    pub consecutive_collisions: u32,
}

impl ChargeAbility {
    pub fn ready(&self) -> bool {
        self.cooldown_timer <= 0.0
    }

    pub fn start_cooldown(&mut self, duration: f32) {
        self.cooldown_timer = duration;
    }

    pub fn tick(&mut self, delta: f32) {
        if self.cooldown_timer > 0.0 {
            self.cooldown_timer -= delta;
        }
    }
}

/// Поверхность контакта charge'а (тег от trigger volume)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSurface {
    Player,
    Cushion,
    Wall,
}

/// Событие от collision collaborator'а: charge во что-то врезался
#[derive(Event, Debug, Clone)]
pub struct ChargeContact {
    pub agent: Entity,
    pub surface: ContactSurface,
    /// Задетое entity (None для стен)
    pub other: Option<Entity>,
    pub point: Vec3,
}

/// Исходящее уведомление cushion collaborator'у: (attackerPosition,
/// contactPoint) — его squash анимация вне ядра.
#[derive(Event, Debug, Clone)]
pub struct CushionImpact {
    pub cushion: Option<Entity>,
    pub attacker_position: Vec3,
    pub contact_point: Vec3,
}

/// Система: tick charge cooldowns
pub fn tick_charge_cooldowns(mut abilities: Query<&mut ChargeAbility>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();
    for mut ability in abilities.iter_mut() {
        ability.tick(delta);
    }
}

/// Система: физический драйв charge'а
///
/// Ramp к target_speed вдоль залоченного направления; после перелёта
/// target point — торможение. Завершение обрабатывает FSM система.
pub fn drive_charges(
    mut agents: Query<
        (&mut AgentState, &mut PhysicsBody, &Transform, &RampageConfig),
        With<Rampage>,
    >,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (mut state, mut body, transform, config) in agents.iter_mut() {
        let AgentState::Charging { charge } = &mut *state else {
            continue;
        };
        if body.frozen {
            continue;
        }

        charge.elapsed += delta;

        if !charge.overran {
            charge.target.current_speed = (charge.target.current_speed
                + config.charge.acceleration * delta)
                .min(charge.target.target_speed);

            let to_target = charge.target.target_point - transform.translation;
            if to_target.dot(charge.target.direction) <= 0.0 {
                charge.overran = true;
            }
        } else {
            charge.target.current_speed =
                (charge.target.current_speed - config.charge.deceleration * delta).max(0.0);
        }

        body.velocity = charge.target.direction * charge.target.current_speed;
    }
}

/// Исход контакта, требующий перехода состояния
enum ContactOutcome {
    Stay,
    Stun,
    OpenPanels,
}

/// Система: обработка контактов charge'а
///
/// Guard: события валидны только пока агент в Charging — stale контакт
/// после смены состояния игнорируется с диагностическим логом.
#[allow(clippy::too_many_arguments)]
pub fn process_charge_contacts(
    mut contacts: EventReader<ChargeContact>,
    mut agents: Query<
        (
            &mut AgentState,
            &mut StateMachine,
            &mut PhysicsBody,
            &mut NavigationAgent,
            &mut PanelArray,
            &mut StuckWindow,
            &mut ChargeAbility,
            &mut Health,
            &RampageConfig,
            &Transform,
        ),
        With<Rampage>,
    >,
    mut victims: Query<(&mut Health, Option<&mut PhysicsBody>), Without<Rampage>>,
    audio: Res<AudioChannel>,
    mut state_events: ResMut<Events<StateChanged>>,
    mut cushion_events: EventWriter<CushionImpact>,
    mut damage_events: EventWriter<DamageDealt>,
    mut died_events: EventWriter<EntityDied>,
) {
    for contact in contacts.read() {
        let Ok((
            mut state,
            mut machine,
            mut body,
            mut nav,
            mut panels,
            mut stuck,
            mut ability,
            mut health,
            config,
            transform,
        )) = agents.get_mut(contact.agent)
        else {
            continue;
        };

        let current_name = state.name();
        let outcome = {
            let AgentState::Charging { charge } = &mut *state else {
                crate::log(&format!(
                    "Charge: stale contact for {:?} in {} ignored",
                    contact.agent, current_name
                ));
                continue;
            };

            match contact.surface {
                ContactSurface::Player => {
                    // Звук контакта всегда; урон — один раз за charge
                    audio.one_shot(cues::RUSH_HIT, contact.point);

                    if !charge.rush_damage_dealt {
                        charge.rush_damage_dealt = true;

                        if let Some(victim) = contact.other {
                            if let Ok((mut victim_health, victim_body)) = victims.get_mut(victim) {
                                let was_alive = victim_health.is_alive();
                                victim_health.take_damage(config.charge.rush_damage);

                                if let Some(mut victim_body) = victim_body {
                                    victim_body.apply_impulse(
                                        charge.target.direction * config.charge.knockback,
                                    );
                                }

                                let target_died = was_alive && !victim_health.is_alive();
                                damage_events.write(DamageDealt {
                                    attacker: contact.agent,
                                    target: victim,
                                    damage: config.charge.rush_damage,
                                    damage_type: DamageType::Charge,
                                    target_died,
                                });
                                if target_died {
                                    died_events.write(EntityDied {
                                        entity: victim,
                                        killer: Some(contact.agent),
                                    });
                                }

                                crate::log(&format!(
                                    "Charge: {:?} rammed {:?} for {} dmg",
                                    contact.agent, victim, config.charge.rush_damage
                                ));
                            }
                        }
                    }

                    // Таран цели charge НЕ завершает — несёмся дальше
                    ContactOutcome::Stay
                }

                ContactSurface::Cushion => {
                    charge.cushion_hit = true;
                    ability.consecutive_collisions += 1;
                    if ability.consecutive_collisions >= MAX_CONSECUTIVE_COLLISIONS {
                        crate::log(&format!(
                            "Charge: {:?} hit {} consecutive obstacles (recovery disabled)",
                            contact.agent, ability.consecutive_collisions
                        ));
                    }

                    audio.one_shot(cues::IMPACT_CUSHION, contact.point);
                    cushion_events.write(CushionImpact {
                        cushion: contact.other,
                        attacker_position: transform.translation,
                        contact_point: contact.point,
                    });

                    crate::log(&format!(
                        "Charge: {:?} absorbed by cushion, no HP loss",
                        contact.agent
                    ));
                    ContactOutcome::Stun
                }

                ContactSurface::Wall => {
                    if charge.wall_hit {
                        crate::log(&format!(
                            "Charge: duplicate wall hit for {:?} suppressed",
                            contact.agent
                        ));
                        continue;
                    }
                    charge.wall_hit = true;
                    ability.consecutive_collisions += 1;
                    if ability.consecutive_collisions >= MAX_CONSECUTIVE_COLLISIONS {
                        crate::log(&format!(
                            "Charge: {:?} hit {} consecutive obstacles (recovery disabled)",
                            contact.agent, ability.consecutive_collisions
                        ));
                    }

                    audio.one_shot(cues::IMPACT_WALL, contact.point);
                    health.take_damage(config.hp_loss_on_wall_hit);
                    crate::log(&format!(
                        "Charge: {:?} hit wall uncushioned, -{} HP ({} left), exposing panels",
                        contact.agent, config.hp_loss_on_wall_hit, health.current
                    ));
                    ContactOutcome::OpenPanels
                }
            }
        };

        match outcome {
            ContactOutcome::Stay => {}
            ContactOutcome::Stun => {
                change_state(
                    contact.agent,
                    &mut state,
                    AgentState::Stunned {
                        elapsed: 0.0,
                        duration: config.stunned_duration,
                    },
                    &mut machine,
                    &mut body,
                    &mut nav,
                    &mut panels,
                    &mut stuck,
                    config,
                    &audio,
                    transform.translation,
                    &mut state_events,
                );
            }
            ContactOutcome::OpenPanels => {
                change_state(
                    contact.agent,
                    &mut state,
                    AgentState::PanelOpen {
                        elapsed: 0.0,
                        duration: config.panel_open_duration,
                    },
                    &mut machine,
                    &mut body,
                    &mut nav,
                    &mut panels,
                    &mut stuck,
                    config,
                    &audio,
                    transform.translation,
                    &mut state_events,
                );
            }
        }
    }
}
