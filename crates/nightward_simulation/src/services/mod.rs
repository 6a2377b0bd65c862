//! Injected collaborator services (audio, time-of-day)
//!
//! Ядро не знает про FMOD/engine аудио — только про AudioSink контракт.
//! Engine bridge инжектит свой sink при старте (тот же паттерн что logger).

use bevy::prelude::*;
use std::sync::{Arc, Mutex};

/// Звуковые cue names (контракт с audio bank'ом engine bridge)
pub mod cues {
    pub const CHARGE_WINDUP_LOOP: &str = "rampage/charge_windup_loop";
    pub const CHARGE_LOOP: &str = "rampage/charge_loop";
    pub const PANEL_ALARM_LOOP: &str = "rampage/panel_alarm_loop";
    pub const IMPACT_WALL: &str = "rampage/impact_wall";
    pub const IMPACT_CUSHION: &str = "rampage/impact_cushion";
    pub const RUSH_HIT: &str = "rampage/rush_hit";
    pub const PANEL_BREAK: &str = "rampage/panel_break";
    pub const STUN: &str = "rampage/stun";
    pub const SHUTDOWN: &str = "rampage/shutdown";
    pub const EXPLOSION: &str = "rampage/explosion";
    pub const HURT: &str = "rampage/hurt";
}

/// Audio backend контракт: one-shot 3D звуки + лупы привязанные к entity.
///
/// Fire-and-forget — ядро никогда не ждёт результата.
pub trait AudioSink: Send + Sync {
    fn one_shot(&self, cue: &str, position: Vec3);
    fn start_loop(&self, entity: Entity, cue: &str);
    fn stop_loop(&self, entity: Entity, cue: &str);
}

/// Resource-обёртка над инжектированным audio sink'ом
#[derive(Resource)]
pub struct AudioChannel {
    sink: Box<dyn AudioSink>,
}

impl Default for AudioChannel {
    fn default() -> Self {
        Self::new(Box::new(NullAudio))
    }
}

impl AudioChannel {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self { sink }
    }

    pub fn one_shot(&self, cue: &str, position: Vec3) {
        self.sink.one_shot(cue, position);
    }

    pub fn start_loop(&self, entity: Entity, cue: &str) {
        self.sink.start_loop(entity, cue);
    }

    pub fn stop_loop(&self, entity: Entity, cue: &str) {
        self.sink.stop_loop(entity, cue);
    }
}

/// No-op sink для headless билдов
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn one_shot(&self, _cue: &str, _position: Vec3) {}
    fn start_loop(&self, _entity: Entity, _cue: &str) {}
    fn stop_loop(&self, _entity: Entity, _cue: &str) {}
}

/// Записывающий sink для тестов: фиксирует вызовы в порядке поступления.
///
/// Формат записи: "one_shot:<cue>", "start_loop:<cue>", "stop_loop:<cue>".
pub struct RecordingAudio {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingAudio {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl AudioSink for RecordingAudio {
    fn one_shot(&self, cue: &str, _position: Vec3) {
        self.calls.lock().unwrap().push(format!("one_shot:{}", cue));
    }

    fn start_loop(&self, _entity: Entity, cue: &str) {
        self.calls.lock().unwrap().push(format!("start_loop:{}", cue));
    }

    fn stop_loop(&self, _entity: Entity, cue: &str) {
        self.calls.lock().unwrap().push(format!("stop_loop:{}", cue));
    }
}

/// Грубое время суток — выбирает вариант casting time / cooldown из конфига.
///
/// Владеет им внешний календарь (external collaborator); ядро только читает.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOfDay {
    #[default]
    Morning,
    Afternoon,
}
