//! Recording camera.

use std::sync::Mutex;

use coven_core::camera::CameraController;

/// A camera operation observed by [`RecordingCamera`].
#[derive(Debug, Clone, PartialEq)]
pub enum CameraCall {
    /// `pan_to` was called.
    Pan {
        /// Target x.
        x: f64,
        /// Target y.
        y: f64,
        /// Duration in milliseconds.
        duration_ms: u32,
    },
    /// `lock_to_qubit` was called.
    LockToQubit,
}

/// A camera that records every call.
#[derive(Debug, Default)]
pub struct RecordingCamera {
    calls: Mutex<Vec<CameraCall>>,
}

impl RecordingCamera {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every call so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<CameraCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl CameraController for RecordingCamera {
    fn pan_to(&self, x: f64, y: f64, duration_ms: u32) {
        self.calls
            .lock()
            .unwrap()
            .push(CameraCall::Pan { x, y, duration_ms });
    }

    fn lock_to_qubit(&self) {
        self.calls.lock().unwrap().push(CameraCall::LockToQubit);
    }
}
