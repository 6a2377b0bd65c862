//! Pluggable logger для simulation core
//!
//! Engine bridge инжектит свой sink через set_sink(); headless билды
//! используют ConsoleSink. Timestamp добавляем здесь, не в sink'е.

use once_cell::sync::Lazy;
use std::sync::Mutex;

static SINK: Lazy<Mutex<Option<Box<dyn LogSink>>>> = Lazy::new(|| Mutex::new(None));
static LEVEL: Lazy<Mutex<LogLevel>> = Lazy::new(|| Mutex::new(LogLevel::Debug));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

pub fn set_sink(sink: Box<dyn LogSink>) {
    *SINK.lock().unwrap() = Some(sink);
}

pub fn set_sink_if_needed(sink: Box<dyn LogSink>) {
    let mut guard = SINK.lock().unwrap();
    if guard.is_none() {
        *guard = Some(sink);
    }
}

pub fn set_log_level(level: LogLevel) {
    *LEVEL.lock().unwrap() = level;
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

pub fn log_with_level(level: LogLevel, message: &str) {
    if level < *LEVEL.lock().unwrap() {
        return;
    }
    if let Some(sink) = SINK.lock().unwrap().as_ref() {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        sink.log(level, &format!("[{}] {}", timestamp, message));
    }
}

pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_str(), message);
    }
}

pub fn init_logger() {
    set_sink_if_needed(Box::new(ConsoleSink));
}
