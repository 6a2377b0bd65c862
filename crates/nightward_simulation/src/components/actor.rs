//! Базовые компоненты акторов: Actor, Health

use bevy::prelude::*;

/// Актор (враг, выживший) — базовый компонент для живых существ
///
/// Required Components автоматически добавляют Health.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
#[require(Health)]
pub struct Actor {
    /// Stable ID фракции (Rampage vs выжившие)
    pub faction_id: u64,
}

/// Core health pool
///
/// Инвариант: 0 <= current <= max. Отдельный pool от panel health.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }

    pub fn heal(&mut self, amount: u32) {
        self.current = (self.current + amount).min(self.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage() {
        let mut health = Health::new(60);
        health.take_damage(15);
        assert_eq!(health.current, 45);
        assert!(health.is_alive());

        health.take_damage(100); // Saturating sub
        assert_eq!(health.current, 0);
        assert!(!health.is_alive());
    }

    #[test]
    fn test_health_heal_caps_at_max() {
        let mut health = Health::new(60);
        health.take_damage(20);
        health.heal(100);
        assert_eq!(health.current, 60);
    }
}
