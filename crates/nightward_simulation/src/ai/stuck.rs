//! Stuck detection: rolling window позиций + escape maneuver
//!
//! Каждый sample_interval пишем позицию в кольцевой буфер и считаем средний
//! шаг между соседними сэмплами. Если шаг ниже порога дольше max_stuck_time
//! — сигналим «stuck» ровно один раз и запускаем recovery: боковая точка
//! ухода + временный speed boost, БЕЗ смены состояния. Generation guard
//! обрывает escape при любом переходе.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::ai::components::{AgentState, StateMachine};
use crate::combat::damage::Dead;
use crate::components::{NavigationAgent, RampageConfig};
use crate::rampage::Rampage;
use crate::DeterministicRng;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StuckConfig {
    /// Размер кольцевого буфера (сэмплы)
    pub window_len: usize,
    /// Интервал сэмплирования позиции (секунды)
    pub sample_interval: f32,
    /// Порог среднего шага между сэмплами (метры)
    pub displacement_threshold: f32,
    /// Сколько держимся ниже порога до сигнала (секунды)
    pub max_stuck_time: f32,
    /// Дистанция боковой точки ухода (метры)
    pub escape_distance: f32,
    /// Множитель скорости на время recovery
    pub escape_boost: f32,
    /// Длительность boost'а (секунды)
    pub escape_boost_duration: f32,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            window_len: 6,
            sample_interval: 0.5,
            displacement_threshold: 0.15,
            max_stuck_time: 2.0,
            escape_distance: 4.0,
            escape_boost: 1.6,
            escape_boost_duration: 2.0,
        }
    }
}

/// Активный recovery maneuver (живёт внутри StuckWindow)
#[derive(Debug, Clone, Copy)]
pub struct EscapeManeuver {
    pub point: Vec3,
    pub timer: f32,
    pub speed_mult: f32,
    /// Поколение перехода на момент запуска — guard от stale resume
    pub generation: u32,
}

/// Rolling window недавних позиций + учёт времени ниже порога
#[derive(Component, Debug, Clone, Default)]
pub struct StuckWindow {
    samples: VecDeque<Vec3>,
    sample_timer: f32,
    below_threshold_time: f32,
    escape: Option<EscapeManeuver>,
    /// Диагностика: сколько раз сигналили stuck
    pub stuck_count: u32,
}

impl StuckWindow {
    /// Полный сброс (вызывается на каждом переходе состояния)
    pub fn reset(&mut self) {
        self.samples.clear();
        self.sample_timer = 0.0;
        self.below_threshold_time = 0.0;
        self.escape = None;
    }

    pub fn escape_active(&self) -> bool {
        self.escape.is_some()
    }

    pub fn escape_point(&self) -> Option<Vec3> {
        self.escape.map(|m| m.point)
    }

    pub fn escape_speed_mult(&self) -> Option<f32> {
        self.escape.map(|m| m.speed_mult)
    }

    pub fn begin_escape(&mut self, maneuver: EscapeManeuver) {
        self.stuck_count += 1;
        self.samples.clear();
        self.sample_timer = 0.0;
        self.below_threshold_time = 0.0;
        self.escape = Some(maneuver);
    }

    /// Тикает активный escape; generation mismatch или истёкший таймер
    /// завершают recovery и очищают окно
    pub fn tick_escape(&mut self, delta: f32, current_generation: u32) {
        let Some(maneuver) = &mut self.escape else {
            return;
        };

        if maneuver.generation != current_generation {
            // Состояние сменилось — recovery отменён
            self.escape = None;
            return;
        }

        maneuver.timer -= delta;
        if maneuver.timer <= 0.0 {
            self.escape = None;
            self.samples.clear();
            self.below_threshold_time = 0.0;
        }
    }

    /// Регистрирует позицию; возвращает true ровно один раз когда агент
    /// признан застрявшим. Во время активного escape не накапливает.
    pub fn record(&mut self, position: Vec3, delta: f32, config: &StuckConfig) -> bool {
        if self.escape.is_some() {
            return false;
        }

        self.sample_timer += delta;
        if self.sample_timer < config.sample_interval {
            return false;
        }
        self.sample_timer = 0.0;

        if self.samples.len() == config.window_len {
            self.samples.pop_front();
        }
        self.samples.push_back(position);

        if self.samples.len() < config.window_len {
            return false;
        }

        let mut total = 0.0;
        for pair in self.samples.iter().zip(self.samples.iter().skip(1)) {
            total += pair.0.distance(*pair.1);
        }
        let average = total / (self.samples.len() - 1) as f32;

        if average >= config.displacement_threshold {
            // Нормальное перемещение — окно очищается, отсчёт заново
            self.below_threshold_time = 0.0;
            self.samples.clear();
            self.samples.push_back(position);
            return false;
        }

        self.below_threshold_time += config.sample_interval;
        if self.below_threshold_time > config.max_stuck_time {
            self.below_threshold_time = 0.0;
            return true;
        }

        false
    }
}

/// Событие: агент признан застрявшим (диагностика + внешние подписчики)
#[derive(Event, Debug, Clone)]
pub struct StuckDetected {
    pub agent: Entity,
}

/// Система: stuck detection + запуск recovery
///
/// Окно накапливается только в locomotion состояниях (Patrol/Chase/
/// CenterAttack) — везде где стоим намеренно детектор подавлен и не
/// считает собственный recovery за движение.
pub fn detect_stuck(
    mut agents: Query<
        (
            Entity,
            &AgentState,
            &StateMachine,
            &Transform,
            &mut StuckWindow,
            &NavigationAgent,
            &RampageConfig,
        ),
        (With<Rampage>, Without<Dead>),
    >,
    time: Res<Time<Fixed>>,
    mut rng: ResMut<DeterministicRng>,
    mut events: EventWriter<StuckDetected>,
) {
    let delta = time.delta_secs();

    for (entity, state, machine, transform, mut window, nav, config) in agents.iter_mut() {
        window.tick_escape(delta, machine.generation);

        if !state.is_locomotion() {
            continue;
        }

        if !window.record(transform.translation, delta, &config.stuck) {
            continue;
        }

        // Боковой уход: перпендикуляр к направлению на текущую цель
        let heading = nav
            .destination
            .map(|d| (d - transform.translation).normalize_or_zero())
            .filter(|v| *v != Vec3::ZERO)
            .unwrap_or(Vec3::NEG_Z);
        let side = Vec3::new(-heading.z, 0.0, heading.x);
        let sign = if rng.rng.gen::<bool>() { 1.0 } else { -1.0 };
        let point = transform.translation + side * sign * config.stuck.escape_distance;

        window.begin_escape(EscapeManeuver {
            point,
            timer: config.stuck.escape_boost_duration,
            speed_mult: config.stuck.escape_boost,
            generation: machine.generation,
        });

        crate::log_warning(&format!(
            "Stuck: {:?} displacement below threshold, escaping to {:?}",
            entity, point
        ));
        events.write(StuckDetected { agent: entity });
    }
}
