//! Camera/scene collaborator.

/// Scene camera operations driven by dialogue entries.
pub trait CameraController: Send + Sync {
    /// Pans the camera to world coordinates over `duration_ms`.
    fn pan_to(&self, x: f64, y: f64, duration_ms: u32);

    /// Re-locks the camera onto the player's qubit.
    fn lock_to_qubit(&self);
}
