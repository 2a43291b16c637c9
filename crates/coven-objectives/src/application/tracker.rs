//! The per-phase objective tracker.

use std::sync::Arc;

use coven_content::domain::objective::Objective;
use coven_core::clock::Clock;
use coven_core::event::BusEvent;
use coven_core::grid::GridStateProvider;
use tracing::debug;
use uuid::Uuid;

use super::requirements;
use crate::domain::action::{ObjectiveEvent, TrackedAction};
use crate::domain::snapshot::ObjectiveSnapshot;

/// Append-only record of what the player did during the current phase.
///
/// The log never outlives its phase: [`start_phase`](Self::start_phase) and
/// [`clear_phase`](Self::clear_phase) both discard it.
pub struct ObjectiveTracker {
    clock: Arc<dyn Clock>,
    grid: Arc<dyn GridStateProvider>,
    phase_id: Option<String>,
    events: Vec<ObjectiveEvent>,
}

impl std::fmt::Debug for ObjectiveTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectiveTracker")
            .field("phase_id", &self.phase_id)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl ObjectiveTracker {
    /// Creates a tracker with no phase context.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, grid: Arc<dyn GridStateProvider>) -> Self {
        Self {
            clock,
            grid,
            phase_id: None,
            events: Vec::new(),
        }
    }

    /// Enters `phase_id`, discarding any earlier log.
    pub fn start_phase(&mut self, phase_id: &str) {
        debug!(phase_id, discarded = self.events.len(), "objective log started");
        self.phase_id = Some(phase_id.to_owned());
        self.events.clear();
    }

    /// Discards the log after the current phase completed.
    pub fn clear_phase(&mut self) {
        debug!(phase_id = ?self.phase_id, discarded = self.events.len(), "objective log cleared");
        self.events.clear();
    }

    /// The phase the log currently belongs to.
    #[must_use]
    pub fn phase_id(&self) -> Option<&str> {
        self.phase_id.as_deref()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been recorded since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Appends `action` with the current timestamp.
    pub fn record(&mut self, action: TrackedAction) {
        debug!(kind = action.kind(), phase_id = ?self.phase_id, "objective event recorded");
        self.events.push(ObjectiveEvent {
            event_id: Uuid::new_v4(),
            action,
            recorded_at: self.clock.now(),
        });
    }

    /// Records `event` if it is a player action. Returns whether it was
    /// recorded.
    pub fn observe(&mut self, event: &BusEvent) -> bool {
        match TrackedAction::from_bus_event(event) {
            Some(action) => {
                self.record(action);
                true
            }
            None => false,
        }
    }

    /// Returns an independent copy of the log.
    #[must_use]
    pub fn snapshot(&self) -> ObjectiveSnapshot {
        ObjectiveSnapshot {
            events: self.events.clone(),
            taken_at: self.clock.now(),
            phase_id: self.phase_id.clone(),
        }
    }

    /// Returns whether `objective` holds, evaluated against `snapshot` or a
    /// fresh one.
    #[must_use]
    pub fn validate_objective(
        &self,
        objective: &Objective,
        snapshot: Option<&ObjectiveSnapshot>,
    ) -> bool {
        match snapshot {
            Some(snapshot) => requirements::is_satisfied(objective, snapshot, self.grid.as_ref()),
            None => {
                let fresh = self.snapshot();
                requirements::is_satisfied(objective, &fresh, self.grid.as_ref())
            }
        }
    }
}
