//! FSM AI systems: тики таймеров, decision points, переходы
//!
//! Приоритеты в каждом состоянии зашиты в match'е; все переходы идут через
//! machine::change_state (Exit→Enter ровно один раз). Utility engine
//! опрашивается только на границах Idle/Patrol/Chase.

use bevy::prelude::*;
use rand::Rng;

use crate::ai::components::{AgentState, StateMachine};
use crate::ai::decision::{select_state, AgentStatus, StateTag, UtilityWeights};
use crate::ai::events::{CenterAttackRequested, DebugAction, DebugCommand, StateChanged};
use crate::ai::machine::change_state;
use crate::ai::stuck::StuckWindow;
use crate::combat::charge::{begin_charge, ChargeAbility, ChargeState};
use crate::combat::damage::Dead;
use crate::combat::panels::PanelArray;
use crate::components::{Health, NavigationAgent, RampageConfig};
use crate::perception::{PerceptionSnapshot, TrackedTarget, Vision};
use crate::physics::PhysicsBody;
use crate::rampage::Rampage;
use crate::services::{AudioChannel, TimeOfDay};
use crate::DeterministicRng;

/// Куда возвращаться после завершённого sub-behavior'а (stun, charge,
/// окно панелей): Chase если цель всё ещё обнаружена, иначе Patrol
fn resolve_fallback(snapshot: &PerceptionSnapshot, tracked: &TrackedTarget) -> AgentState {
    match tracked.0 {
        Some(target) if snapshot.detected() => AgentState::Chase {
            target,
            lost_sight: 0.0,
        },
        _ => AgentState::Patrol {
            repath_timer: 0.0,
            target_position: None,
        },
    }
}

/// Система: AI FSM transitions
///
/// Один проход на тик: продвигает таймер активного состояния, спрашивает
/// utility engine в decision points, выполняет переход если предложение
/// отличается от текущего состояния и guard'ы проходят.
pub fn agent_state_transitions(
    mut agents: Query<
        (
            Entity,
            &mut AgentState,
            &mut StateMachine,
            &mut PhysicsBody,
            &mut NavigationAgent,
            &mut PanelArray,
            &mut StuckWindow,
            &mut ChargeAbility,
            &RampageConfig,
            &Vision,
            &PerceptionSnapshot,
            &TrackedTarget,
            &Health,
            &Transform,
        ),
        (With<Rampage>, Without<Dead>),
    >,
    target_transforms: Query<&Transform, Without<Rampage>>,
    tod: Res<TimeOfDay>,
    audio: Res<AudioChannel>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
    mut state_events: ResMut<Events<StateChanged>>,
) {
    let delta = time.delta_secs();
    let weights = UtilityWeights::default();

    for (
        entity,
        mut state,
        mut machine,
        mut body,
        mut nav,
        mut panels,
        mut stuck,
        mut ability,
        config,
        vision,
        snapshot,
        tracked,
        health,
        transform,
    ) in agents.iter_mut()
    {
        machine.time_in_state += delta;

        let status = AgentStatus {
            charge_ready: ability.ready(),
            attack_radius: vision.proximity_range,
        };

        let next: Option<AgentState> = match &mut *state {
            AgentState::Idle => {
                let proposal = select_state(snapshot, &status, StateTag::Patrol, &weights);
                match (proposal, tracked.0) {
                    (StateTag::Chase, Some(target)) => Some(AgentState::Chase {
                        target,
                        lost_sight: 0.0,
                    }),
                    (StateTag::Charge, Some(target)) => Some(AgentState::ChargeWindup {
                        target,
                        elapsed: 0.0,
                        duration: config.windup_for(*tod),
                    }),
                    _ => Some(AgentState::Patrol {
                        repath_timer: 0.0,
                        target_position: None,
                    }),
                }
            }

            AgentState::Patrol {
                repath_timer,
                target_position,
            } => {
                let proposal = select_state(snapshot, &status, StateTag::Patrol, &weights);
                match (proposal, tracked.0) {
                    (StateTag::Chase, Some(target)) => Some(AgentState::Chase {
                        target,
                        lost_sight: 0.0,
                    }),
                    (StateTag::Charge, Some(target)) => Some(AgentState::ChargeWindup {
                        target,
                        elapsed: 0.0,
                        duration: config.windup_for(*tod),
                    }),
                    _ => {
                        // Продолжаем патруль: тикаем repath таймер
                        *repath_timer -= delta;
                        if *repath_timer <= 0.0 || target_position.is_none() {
                            let angle = rng.rng.gen::<f32>() * std::f32::consts::TAU;
                            let span = config.patrol_radius_max - config.patrol_radius_min;
                            let distance = config.patrol_radius_min + rng.rng.gen::<f32>() * span;
                            let offset =
                                Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);
                            *target_position = Some(transform.translation + offset);
                            *repath_timer = config.patrol_repath_interval;
                        }
                        None
                    }
                }
            }

            AgentState::Chase { target, lost_sight } => {
                if snapshot.detected() {
                    *lost_sight = 0.0;
                    if let Some(tracked_entity) = tracked.0 {
                        *target = tracked_entity;
                    }
                } else {
                    *lost_sight += delta;
                }

                if *lost_sight > config.chase_memory {
                    // Память исчерпана — цель упущена
                    Some(AgentState::Patrol {
                        repath_timer: 0.0,
                        target_position: None,
                    })
                } else if select_state(snapshot, &status, StateTag::Chase, &weights)
                    == StateTag::Charge
                {
                    Some(AgentState::ChargeWindup {
                        target: *target,
                        elapsed: 0.0,
                        duration: config.windup_for(*tod),
                    })
                } else {
                    None
                }
            }

            AgentState::ChargeWindup {
                target,
                elapsed,
                duration,
            } => {
                *elapsed += delta;
                if *elapsed < *duration {
                    None
                } else {
                    // Casting time вышел — лочим вектор charge'а ЗДЕСЬ.
                    // Дальше direction не пересчитывается до конца charge'а.
                    match target_transforms.get(*target) {
                        Ok(target_transform) => {
                            let charge = ChargeState::new(begin_charge(
                                transform.translation,
                                target_transform.translation,
                                &config.charge,
                            ));
                            ability.start_cooldown(config.charge_cooldown_for(*tod));
                            Some(AgentState::Charging { charge })
                        }
                        Err(_) => {
                            crate::log_warning(&format!(
                                "FSM: {:?} windup target despawned, falling back to Patrol",
                                entity
                            ));
                            Some(AgentState::Patrol {
                                repath_timer: 0.0,
                                target_position: None,
                            })
                        }
                    }
                }
            }

            AgentState::Charging { charge } => {
                // Движение ведёт combat::charge::drive_charges; здесь только
                // завершение без контакта (расход скорости или max duration)
                let exhausted = charge.elapsed >= config.charge.max_duration
                    || (charge.overran
                        && charge.target.current_speed <= config.charge.stop_speed_threshold);
                if exhausted {
                    Some(resolve_fallback(snapshot, tracked))
                } else {
                    None
                }
            }

            AgentState::PanelOpen { elapsed, duration } => {
                if panels.panel_health() == 0 {
                    Some(AgentState::Disabled { elapsed: 0.0 })
                } else {
                    *elapsed += delta;
                    if *elapsed >= *duration {
                        // Окно экспозиции пережито — панели закрываются
                        Some(resolve_fallback(snapshot, tracked))
                    } else {
                        None
                    }
                }
            }

            AgentState::Stunned { elapsed, duration } => {
                *elapsed += delta;
                if *elapsed >= *duration {
                    Some(resolve_fallback(snapshot, tracked))
                } else {
                    None
                }
            }

            AgentState::Disabled { elapsed } => {
                if health.current == 0 {
                    Some(AgentState::Exploding)
                } else {
                    *elapsed += delta;
                    if *elapsed >= config.disabled_recovery {
                        Some(resolve_fallback(snapshot, tracked))
                    } else {
                        None
                    }
                }
            }

            AgentState::Exploding => None,

            AgentState::CenterAttack { elapsed, duration } => {
                *elapsed += delta;
                if *elapsed >= *duration {
                    Some(AgentState::Patrol {
                        repath_timer: 0.0,
                        target_position: None,
                    })
                } else {
                    None
                }
            }
        };

        if let Some(next) = next {
            change_state(
                entity,
                &mut state,
                next,
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

/// Система: scripted center attack (внешний override)
///
/// Any live state → CenterAttack; Exploding и мёртвых не трогаем.
pub fn process_center_attacks(
    mut requests: EventReader<CenterAttackRequested>,
    mut agents: Query<
        (
            &mut AgentState,
            &mut StateMachine,
            &mut PhysicsBody,
            &mut NavigationAgent,
            &mut PanelArray,
            &mut StuckWindow,
            &RampageConfig,
            &Transform,
        ),
        (With<Rampage>, Without<Dead>),
    >,
    audio: Res<AudioChannel>,
    mut state_events: ResMut<Events<StateChanged>>,
) {
    for request in requests.read() {
        let Ok((
            mut state,
            mut machine,
            mut body,
            mut nav,
            mut panels,
            mut stuck,
            config,
            transform,
        )) = agents.get_mut(request.agent)
        else {
            crate::log_warning(&format!(
                "CenterAttack: agent {:?} not found or dead, request dropped",
                request.agent
            ));
            continue;
        };

        if matches!(*state, AgentState::Exploding) {
            crate::log(&format!(
                "CenterAttack: {:?} is exploding, override ignored",
                request.agent
            ));
            continue;
        }

        change_state(
            request.agent,
            &mut state,
            AgentState::CenterAttack {
                elapsed: 0.0,
                duration: config.center_attack_duration,
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

/// Система: debug/test hooks (форсированные переходы)
///
/// Development-only: работает и на мёртвых агентах — нужно для проверки
/// idempotence взрыва.
pub fn process_debug_commands(
    mut commands_in: EventReader<DebugCommand>,
    mut agents: Query<
        (
            &mut AgentState,
            &mut StateMachine,
            &mut PhysicsBody,
            &mut NavigationAgent,
            &mut PanelArray,
            &mut StuckWindow,
            &RampageConfig,
            &TrackedTarget,
            &Transform,
        ),
        With<Rampage>,
    >,
    target_transforms: Query<&Transform, Without<Rampage>>,
    audio: Res<AudioChannel>,
    mut state_events: ResMut<Events<StateChanged>>,
) {
    for command in commands_in.read() {
        let Ok((
            mut state,
            mut machine,
            mut body,
            mut nav,
            mut panels,
            mut stuck,
            config,
            tracked,
            transform,
        )) = agents.get_mut(command.agent)
        else {
            continue;
        };

        let next = match command.action {
            DebugAction::ChargeNow => {
                let aim = tracked
                    .0
                    .and_then(|t| target_transforms.get(t).ok())
                    .map(|t| t.translation)
                    .unwrap_or(transform.translation + *transform.forward() * 10.0);
                let charge = ChargeState::new(begin_charge(
                    transform.translation,
                    aim,
                    &config.charge,
                ));
                AgentState::Charging { charge }
            }
            DebugAction::ExplodeNow => AgentState::Exploding,
            DebugAction::DisableNow => AgentState::Disabled { elapsed: 0.0 },
        };

        crate::log_warning(&format!(
            "Debug: forcing {:?} -> {}",
            command.agent,
            next.name()
        ));

        change_state(
            command.agent,
            &mut state,
            next,
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
