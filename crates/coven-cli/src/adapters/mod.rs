//! Host-side implementations of the quest core's outbound interfaces.

pub mod bus;
pub mod camera;
pub mod grid;

pub use bus::LoggingEventBus;
pub use camera::LoggingCamera;
pub use grid::FileGrid;
