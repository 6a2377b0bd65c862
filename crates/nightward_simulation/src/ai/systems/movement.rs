//! AI movement systems: AgentState → MovementCommand

use bevy::prelude::*;

use crate::ai::components::AgentState;
use crate::ai::stuck::StuckWindow;
use crate::combat::damage::Dead;
use crate::components::{MovementCommand, RampageConfig};
use crate::rampage::Rampage;

/// Система: конвертация AgentState → MovementCommand
///
/// Escape maneuver от stuck детектора перекрывает обычную цель (только в
/// locomotion состояниях) — это re-target БЕЗ смены состояния.
pub fn movement_from_state(
    mut query: Query<
        (
            &AgentState,
            &mut MovementCommand,
            &StuckWindow,
            &RampageConfig,
        ),
        (With<Rampage>, Without<Dead>),
    >,
) {
    for (state, mut command, stuck, config) in query.iter_mut() {
        if state.is_locomotion() {
            if let Some(point) = stuck.escape_point() {
                if !matches!(*command, MovementCommand::MoveToPosition { target } if target == point)
                {
                    *command = MovementCommand::MoveToPosition { target: point };
                }
                continue;
            }
        }

        match state {
            AgentState::Idle => {
                if !matches!(*command, MovementCommand::Idle) {
                    *command = MovementCommand::Idle;
                }
            }

            AgentState::Patrol {
                target_position, ..
            } => match target_position {
                Some(target) => {
                    // Guard от спама Changed<MovementCommand>
                    if !matches!(*command, MovementCommand::MoveToPosition { target: t } if t == *target)
                    {
                        *command = MovementCommand::MoveToPosition { target: *target };
                    }
                }
                None => {
                    if !matches!(*command, MovementCommand::Idle) {
                        *command = MovementCommand::Idle;
                    }
                }
            },

            AgentState::Chase { target, .. } => {
                if !matches!(*command, MovementCommand::FollowEntity { target: t } if t == *target)
                {
                    *command = MovementCommand::FollowEntity { target: *target };
                }
            }

            AgentState::CenterAttack { .. } => {
                let center = config.center_point();
                if !matches!(*command, MovementCommand::MoveToPosition { target } if target == center)
                {
                    *command = MovementCommand::MoveToPosition { target: center };
                }
            }

            // Остальные состояния стоят на месте (charge ведёт тело сам,
            // мимо navigation agent'а)
            AgentState::ChargeWindup { .. }
            | AgentState::Charging { .. }
            | AgentState::PanelOpen { .. }
            | AgentState::Stunned { .. }
            | AgentState::Disabled { .. }
            | AgentState::Exploding => {
                if !matches!(*command, MovementCommand::Stop) {
                    *command = MovementCommand::Stop;
                }
            }
        }
    }
}
