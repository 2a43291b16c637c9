//! Camera that only logs.

use coven_core::camera::CameraController;
use tracing::info;

/// Logs camera directives instead of moving a viewport.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCamera;

impl CameraController for LoggingCamera {
    fn pan_to(&self, x: f64, y: f64, duration_ms: u32) {
        info!(x, y, duration_ms, "camera pan");
    }

    fn lock_to_qubit(&self) {
        info!("camera locked to qubit");
    }
}
