//! Movement компоненты: команды перемещения + контракт navigation agent'а

use bevy::prelude::*;

/// Команда движения для актора (high-level intent)
///
/// Архитектура:
/// - AI система пишет MovementCommand
/// - Navigation driver читает и конвертирует в NavigationAgent destination
/// - Physics применяет velocity
#[derive(Component, Debug, Clone, PartialEq)]
pub enum MovementCommand {
    /// Стоять на месте (не обновлять destination)
    Idle,
    /// Двигаться к позиции (world coordinates)
    MoveToPosition { target: Vec3 },
    /// Следовать за entity (обновлять target каждый тик)
    FollowEntity { target: Entity },
    /// Остановиться немедленно (сбросить velocity)
    Stop,
}

impl Default for MovementCommand {
    fn default() -> Self {
        Self::Idle
    }
}

/// Agent-facing контракт навигации (SetDestination/Speed/IsStopped/Enabled)
///
/// Реализация pathfinding'а — external collaborator (navmesh в engine
/// bridge); headless driver ведёт тело по прямой. Ядро трогает только
/// эти поля.
#[derive(Component, Debug, Clone)]
pub struct NavigationAgent {
    /// Текущая цель (None = стоим)
    pub destination: Option<Vec3>,
    /// Крейсерская скорость (м/с)
    pub speed: f32,
    /// Пауза без сброса destination
    pub is_stopped: bool,
    /// Выключенный agent игнорируется driver'ом (charge ведёт тело сам)
    pub enabled: bool,
    /// Измеренная скорость за последний тик
    pub velocity: Vec3,
    /// Радиус прибытия (метры)
    pub arrive_radius: f32,
}

impl NavigationAgent {
    pub fn new(speed: f32) -> Self {
        Self {
            destination: None,
            speed,
            is_stopped: false,
            enabled: true,
            velocity: Vec3::ZERO,
            arrive_radius: 0.3,
        }
    }

    pub fn set_destination(&mut self, point: Vec3) {
        self.destination = Some(point);
    }

    pub fn clear_destination(&mut self) {
        self.destination = None;
    }
}

impl Default for NavigationAgent {
    fn default() -> Self {
        Self::new(2.5)
    }
}
