//! Event bus that logs every event.

use std::sync::atomic::{AtomicUsize, Ordering};

use coven_core::event::{BusEvent, EventBus};
use tracing::{info, warn};

/// Writes each emitted event to the log as JSON and counts them.
#[derive(Debug, Default)]
pub struct LoggingEventBus {
    emitted: AtomicUsize,
}

impl LoggingEventBus {
    /// Creates a bus with a zero count.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl EventBus for LoggingEventBus {
    fn emit(&self, event: &BusEvent) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        match serde_json::to_string(event) {
            Ok(json) => info!(event = event.name(), payload = %json, "bus event"),
            Err(e) => warn!(event = event.name(), error = %e, "bus event not serializable"),
        }
    }
}
