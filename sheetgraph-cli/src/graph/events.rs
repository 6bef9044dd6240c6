//! Progress and problem reporting
//!
//! The pipeline reports through an [`EventSink`] passed in by the caller.

use std::sync::Mutex;

/// Receiver of pipeline events
pub trait EventSink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards events to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn error(&self, message: &str) {
        log::error!("{}", message);
    }
}

/// A recorded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Info(String),
    Error(String),
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Info(message) => Some(message),
                Event::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Error(message) => Some(message),
                Event::Info(_) => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl EventSink for MemorySink {
    fn info(&self, message: &str) {
        log::debug!("{}", message);
        self.record(Event::Info(message.to_string()));
    }

    fn error(&self, message: &str) {
        log::debug!("{}", message);
        self.record(Event::Error(message.to_string()));
    }
}
