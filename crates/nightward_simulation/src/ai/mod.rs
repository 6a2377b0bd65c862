//! AI decision-making module
//!
//! Perception → utility decision → FSM transitions → movement commands.
//! Всё в FixedUpdate, chain() внутри набора для детерминизма.

use bevy::prelude::*;

pub mod components;
pub mod decision;
pub mod events;
pub mod machine;
pub mod stuck;
pub mod systems;

// Re-export основных типов
pub use components::{AgentState, StateMachine};
pub use decision::{select_state, AgentStatus, StateTag, UtilityWeights};
pub use events::{CenterAttackRequested, DebugAction, DebugCommand, StateChanged};
pub use machine::change_state;
pub use stuck::{StuckConfig, StuckDetected, StuckWindow};

use crate::perception;
use crate::SimulationSet;

/// AI Plugin
///
/// Порядок выполнения (FixedUpdate):
/// 1. update_perception — snapshot + spotted/lost events (Perception set)
/// 2. agent_state_transitions — decision points + переходы
/// 3. process_center_attacks / process_debug_commands — внешние overrides
/// 4. detect_stuck — rolling window + escape maneuver
/// 5. movement_from_state — AgentState → MovementCommand
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<perception::PerceptionEvent>()
            .add_event::<StateChanged>()
            .add_event::<CenterAttackRequested>()
            .add_event::<DebugCommand>()
            .add_event::<StuckDetected>();

        app.add_systems(
            FixedUpdate,
            perception::update_perception.in_set(SimulationSet::Perception),
        );

        app.add_systems(
            FixedUpdate,
            (
                systems::fsm::agent_state_transitions,
                systems::fsm::process_center_attacks,
                systems::fsm::process_debug_commands,
                stuck::detect_stuck,
                systems::movement::movement_from_state,
            )
                .chain()
                .in_set(SimulationSet::Ai),
        );
    }
}
