//! FSM AI components (agent state machine + generation counter)

use bevy::prelude::*;

use crate::combat::charge::ChargeState;

/// Состояния Rampage агента
///
/// Ровно один вариант активен (он и есть значение компонента). Все
/// таймеры — явные {elapsed, duration} поля вариантов, продвигаются в
/// FixedUpdate; никаких корутин. Смена состояния уничтожает таймеры
/// старого варианта — отложенный шаг не может сработать после перехода.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub enum AgentState {
    /// Начальное состояние после спавна
    Idle,

    /// Patrol — случайное блуждание в поисках цели
    Patrol {
        /// Время до следующей patrol точки
        repath_timer: f32,
        /// Текущая точка патруля (генерируется из DeterministicRng)
        target_position: Option<Vec3>,
    },

    /// Chase — преследование видимой цели
    Chase {
        target: Entity,
        /// Сколько секунд цель не видна (chase memory)
        lost_sight: f32,
    },

    /// Замах перед charge (casting time по времени суток)
    ChargeWindup {
        target: Entity,
        elapsed: f32,
        duration: f32,
    },

    /// Committed charge — направление залочено в ChargeState
    Charging { charge: ChargeState },

    /// Окно экспозиции панелей после удара о стену
    PanelOpen { elapsed: f32, duration: f32 },

    /// Оглушение после cushion удара
    Stunned { elapsed: f32, duration: f32 },

    /// Панели выбиты, ядро уязвимо
    Disabled { elapsed: f32 },

    /// Терминальная детонация (one-shot, см. combat::explosion)
    Exploding,

    /// Scripted атака к центру арены (внешний триггер)
    CenterAttack { elapsed: f32, duration: f32 },
}

impl Default for AgentState {
    fn default() -> Self {
        Self::Idle
    }
}

impl AgentState {
    /// Имя состояния для логов и StateChanged событий
    pub fn name(&self) -> &'static str {
        match self {
            AgentState::Idle => "Idle",
            AgentState::Patrol { .. } => "Patrol",
            AgentState::Chase { .. } => "Chase",
            AgentState::ChargeWindup { .. } => "ChargeWindup",
            AgentState::Charging { .. } => "Charging",
            AgentState::PanelOpen { .. } => "PanelOpen",
            AgentState::Stunned { .. } => "Stunned",
            AgentState::Disabled { .. } => "Disabled",
            AgentState::Exploding => "Exploding",
            AgentState::CenterAttack { .. } => "CenterAttack",
        }
    }

    /// Состояния где агент обязан перемещаться — только в них работает
    /// stuck detection (везде где стоим намеренно он подавлен)
    pub fn is_locomotion(&self) -> bool {
        matches!(
            self,
            AgentState::Patrol { .. } | AgentState::Chase { .. } | AgentState::CenterAttack { .. }
        )
    }

    /// Прогресс телеграфа замаха 0..1 (scale/blend shrink у рендера)
    pub fn windup_progress(&self) -> Option<f32> {
        match self {
            AgentState::ChargeWindup {
                elapsed, duration, ..
            } => Some((elapsed / duration.max(1e-6)).clamp(0.0, 1.0)),
            _ => None,
        }
    }
}

/// Служебное состояние машины: счётчик поколений переходов.
///
/// Generation — guard для отложенных шагов (escape boost, stale события):
/// шаг, закешировавший поколение, не resumится после смены состояния.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct StateMachine {
    pub generation: u32,
    pub time_in_state: f32,
}
