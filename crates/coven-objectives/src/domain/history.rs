//! What a requirement predicate may ask about past player actions.

/// One-shot player actions whose mere occurrence satisfies an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The code terminal was opened.
    TerminalOpened,
    /// The play button was pressed.
    PlayClicked,
    /// The plant action was clicked.
    PlantClicked,
    /// The harvest action was clicked.
    HarvestClicked,
}

/// Read-only view over recorded player actions.
///
/// Implemented by the tracker's event-log snapshot and by the dialogue
/// manager's tutorial state, so both evaluate requirements with the same
/// predicates.
pub trait ActionHistory {
    /// Whether the player moved in `direction` (already normalized).
    fn has_moved(&self, direction: &str) -> bool;

    /// Whether `signal` occurred at least once.
    fn has_signal(&self, signal: Signal) -> bool;

    /// The most recent program text, if any code change was seen.
    fn latest_code(&self) -> Option<&str>;

    /// How many times `entity_id` planted.
    fn entity_plants(&self, entity_id: &str) -> u32;

    /// How many times `entity_id` harvested.
    fn entity_harvests(&self, entity_id: &str) -> u32;
}
