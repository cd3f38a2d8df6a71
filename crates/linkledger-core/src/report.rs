//! Reporting capability handed to every component.
//!
//! Components never log through a global directly; they hold an
//! `Arc<dyn Reporter>` so tests can capture what was said.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_log(self) -> log::Level {
        match self {
            Level::Debug => log::Level::Debug,
            Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
            Level::Error => log::Level::Error,
        }
    }
}

pub trait Reporter: Send + Sync {
    fn report(&self, component: &str, level: Level, message: &str);

    fn debug(&self, component: &str, message: &str) {
        self.report(component, Level::Debug, message)
    }

    fn info(&self, component: &str, message: &str) {
        self.report(component, Level::Info, message)
    }

    fn warn(&self, component: &str, message: &str) {
        self.report(component, Level::Warn, message)
    }

    fn error(&self, component: &str, message: &str) {
        self.report(component, Level::Error, message)
    }
}

/// Forwards to the `log` facade, targeted as `linkledger::<component>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, component: &str, level: Level, message: &str) {
        let target = format!("linkledger::{}", component);
        log::log!(target: &target, level.as_log(), "{}", message);
    }
}

/// A captured report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub component: String,
    pub level: Level,
    pub message: String,
}

/// Keeps every event in memory. Used by tests.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<Event>>,
}

impl MemoryReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn at_level(&self, level: Level) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.message.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, component: &str, level: Level, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(Event {
                component: component.to_string(),
                level,
                message: message.to_string(),
            });
        }
    }
}

pub fn default_reporter() -> Arc<dyn Reporter> {
    Arc::new(LogReporter)
}
