//! AI components

pub mod fsm;

pub use fsm::{AgentState, StateMachine};
