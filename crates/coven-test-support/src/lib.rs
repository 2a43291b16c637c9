//! Shared test doubles for the Binary Coven quest core.

mod bus;
mod camera;
mod clock;
mod content;
mod grid;
mod store;

pub use bus::RecordingEventBus;
pub use camera::{CameraCall, RecordingCamera};
pub use clock::{FixedClock, SteppingClock};
pub use content::StaticContentSource;
pub use grid::InMemoryGrid;
pub use store::{FailingProgressStore, MemoryProgressStore};
