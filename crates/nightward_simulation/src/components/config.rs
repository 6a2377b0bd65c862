//! Rampage configuration asset
//!
//! Read-only data: все числовые тюнинги агента в одном компоненте,
//! клонируется на entity при спавне. Позиции хранятся как [f32; 3]
//! (serde-friendly), наружу отдаются как Vec3.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::stuck::StuckConfig;
use crate::combat::charge::ChargeConfig;
use crate::combat::explosion::ExplosionSpec;
use crate::perception::Vision;
use crate::services::TimeOfDay;

#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct RampageConfig {
    /// Core HP (отдельный pool от panel health)
    pub core_hp: u32,
    /// HP потеря при столкновении со стеной без cushion
    pub hp_loss_on_wall_hit: u32,
    /// Всего панелей на корпусе
    pub panels_total: usize,
    /// Сколько панелей открывается после wall hit
    pub panels_on_wall_hit: usize,

    /// Крейсерская скорость патруля (м/с)
    pub move_speed: f32,
    /// Скорость преследования (м/с)
    pub chase_speed: f32,
    /// Сколько секунд помним потерянную цель прежде чем вернуться в Patrol
    pub chase_memory: f32,
    /// Интервал смены patrol точки (секунды)
    pub patrol_repath_interval: f32,
    /// Радиус генерации patrol точек (метры, min..max)
    pub patrol_radius_min: f32,
    pub patrol_radius_max: f32,

    /// Длительность Stunned после cushion удара (секунды)
    pub stunned_duration: f32,
    /// Окно экспозиции панелей (секунды)
    pub panel_open_duration: f32,
    /// Время восстановления из Disabled если HP остались (секунды)
    pub disabled_recovery: f32,
    /// Длительность scripted center attack (секунды)
    pub center_attack_duration: f32,
    /// Точка арены для center attack
    pub center_point: [f32; 3],

    pub vision: Vision,
    pub charge: ChargeConfig,
    pub stuck: StuckConfig,
    pub explosion: ExplosionSpec,
}

impl Default for RampageConfig {
    fn default() -> Self {
        Self {
            core_hp: 60,
            hp_loss_on_wall_hit: 15,
            panels_total: 8,
            panels_on_wall_hit: 4,

            move_speed: 2.5,
            chase_speed: 4.0,
            chase_memory: 4.0,
            patrol_repath_interval: 10.0,
            patrol_radius_min: 5.0,
            patrol_radius_max: 15.0,

            stunned_duration: 2.5,
            panel_open_duration: 8.0,
            disabled_recovery: 20.0,
            center_attack_duration: 6.0,
            center_point: [0.0, 0.0, 0.0],

            vision: Vision::default(),
            charge: ChargeConfig::default(),
            stuck: StuckConfig::default(),
            explosion: ExplosionSpec::default(),
        }
    }
}

impl RampageConfig {
    pub fn center_point(&self) -> Vec3 {
        Vec3::from_array(self.center_point)
    }

    /// Casting time замаха — вариант по времени суток
    pub fn windup_for(&self, tod: TimeOfDay) -> f32 {
        match tod {
            TimeOfDay::Morning => self.charge.windup_morning,
            TimeOfDay::Afternoon => self.charge.windup_afternoon,
        }
    }

    /// Cooldown charge'а — вариант по времени суток
    pub fn charge_cooldown_for(&self, tod: TimeOfDay) -> f32 {
        match tod {
            TimeOfDay::Morning => self.charge.cooldown_morning,
            TimeOfDay::Afternoon => self.charge.cooldown_afternoon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_variants() {
        let config = RampageConfig::default();
        assert!(config.windup_for(TimeOfDay::Afternoon) < config.windup_for(TimeOfDay::Morning));
        assert!(
            config.charge_cooldown_for(TimeOfDay::Afternoon)
                < config.charge_cooldown_for(TimeOfDay::Morning)
        );
    }

    #[test]
    fn test_center_point_accessor() {
        let mut config = RampageConfig::default();
        config.center_point = [1.0, 0.0, -2.0];
        assert_eq!(config.center_point(), Vec3::new(1.0, 0.0, -2.0));
    }
}
