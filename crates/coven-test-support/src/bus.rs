//! Recording event bus.

use std::sync::Mutex;

use coven_core::event::{BusEvent, EventBus};

/// An event bus that keeps every emitted event in order.
#[derive(Debug, Default)]
pub struct RecordingEventBus {
    events: Mutex<Vec<BusEvent>>,
}

impl RecordingEventBus {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event emitted so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn events(&self) -> Vec<BusEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the wire names of every event emitted so far.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(BusEvent::name).collect()
    }

    /// Returns how many events named `name` were emitted.
    pub fn count(&self, name: &str) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }

    /// Forgets every recorded event.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventBus for RecordingEventBus {
    fn emit(&self, event: &BusEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
