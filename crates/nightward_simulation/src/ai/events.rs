//! AI события: переходы состояний + внешние entry points
//!
//! Внешние collaborator'ы (scripted encounter, trigger volumes, debug
//! console) общаются с ядром только через эти события — прямых мутаций нет.

use bevy::prelude::*;

/// Событие: state machine сменила состояние
///
/// Exit(from) уже отработал, Enter(to) уже отработал — событие фиксирует
/// завершённый атомарный переход.
#[derive(Event, Debug, Clone)]
pub struct StateChanged {
    pub agent: Entity,
    pub from: &'static str,
    pub to: &'static str,
    /// Поколение перехода (монотонно растёт)
    pub generation: u32,
}

/// Внешний триггер scripted атаки: агент идёт к центру арены на
/// фиксированное время, затем возвращается в Patrol.
#[derive(Event, Debug, Clone)]
pub struct CenterAttackRequested {
    pub agent: Entity,
}

/// Debug/test hooks: форсированные переходы (development-only,
/// не часть steady-state контракта)
#[derive(Event, Debug, Clone)]
pub struct DebugCommand {
    pub agent: Entity,
    pub action: DebugAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugAction {
    ChargeNow,
    ExplodeNow,
    DisableNow,
}
