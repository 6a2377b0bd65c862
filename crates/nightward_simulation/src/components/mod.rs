//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - actor: базовые характеристики (faction, health)
//! - movement: команды перемещения и navigation контракт
//! - config: read-only configuration asset агента

pub mod actor;
pub mod config;
pub mod movement;

// Re-exports для удобного импорта
pub use actor::*;
pub use config::*;
pub use movement::*;
