//! The quest manager state machine.
//!
//! Every mutating operation buffers the bus events it produces; the owner
//! drains them with [`QuestManager::take_signals`] and feeds each one back
//! through [`QuestManager::handle`]. Progress is saved after every mutation.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;
use coven_content::application::loader::{LoadedQuest, validate_quest};
use coven_content::domain::quest::{Quest, QuestPhase, Reward};
use coven_core::camera::CameraController;
use coven_core::clock::Clock;
use coven_core::content::ContentSource;
use coven_core::error::CovenError;
use coven_core::event::{BusEvent, NotificationKind};
use coven_core::grid::GridStateProvider;
use coven_core::store::ProgressStore;
use coven_dialogue::application::manager::{DialogueAdvance, DialogueManager};
use coven_objectives::application::tracker::ObjectiveTracker;
use tracing::{debug, info, warn};

use super::rewards;
use crate::domain::progress::{PhaseProgress, ProgressSnapshot, QuestProgress, QuestState};
use crate::domain::state::QuestEngineState;

/// Minutes on one phase with open objectives after which the player is
/// considered stuck.
pub const STUCK_THRESHOLD_MINUTES: i64 = 10;

/// Drives quests, phases and objectives.
pub struct QuestManager {
    clock: Arc<dyn Clock>,
    grid: Arc<dyn GridStateProvider>,
    store: Arc<dyn ProgressStore>,
    tracker: ObjectiveTracker,
    dialogue: DialogueManager,
    state: QuestEngineState,
    /// The open dialogue is the current phase's pre-dialogue.
    phase_dialogue_open: bool,
    /// The next phase starts once the open dialogue closes.
    pending_advance: bool,
    pending_signals: Vec<BusEvent>,
}

impl std::fmt::Debug for QuestManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestManager")
            .field("active_quest_id", &self.state.active_quest_id)
            .field("current_phase_index", &self.state.current_phase_index)
            .field("tracker", &self.tracker)
            .field("dialogue", &self.dialogue)
            .finish_non_exhaustive()
    }
}

impl QuestManager {
    /// Creates a manager with no quests registered.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        grid: Arc<dyn GridStateProvider>,
        camera: Arc<dyn CameraController>,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        let tracker = ObjectiveTracker::new(clock.clone(), grid.clone());
        let dialogue = DialogueManager::new(camera, grid.clone());
        Self {
            clock,
            grid,
            store,
            tracker,
            dialogue,
            state: QuestEngineState::new(),
            phase_dialogue_open: false,
            pending_advance: false,
            pending_signals: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Registers a parsed quest, replacing any earlier definition with the
    /// same id, and unlocks whatever became eligible.
    ///
    /// # Errors
    ///
    /// Returns `CovenError::InvalidContent` if the quest fails validation.
    pub fn register_quest(&mut self, loaded: LoadedQuest) -> Result<(), CovenError> {
        validate_quest(&loaded.quest)?;
        let LoadedQuest {
            quest,
            content_hash,
        } = loaded;

        info!(quest_id = %quest.id, phases = quest.phases.len(), "quest registered");
        self.pending_signals.push(BusEvent::QuestLoaded {
            quest_id: quest.id.clone(),
            title: quest.title.clone(),
            content_hash: content_hash.clone(),
        });
        self.state
            .content_hashes
            .insert(quest.id.clone(), content_hash);
        self.state.quests.insert(quest.id.clone(), quest);

        if self.refresh_unlocks() {
            self.persist();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Quest lifecycle
    // ------------------------------------------------------------------

    /// Starts or resumes `quest_id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownQuest`, `QuestAlreadyActive` or `QuestLocked` without
    /// changing any state.
    pub fn start_quest(&mut self, quest_id: &str) -> Result<(), CovenError> {
        let Some(quest) = self.state.quests.get(quest_id).cloned() else {
            debug!(quest_id, "start rejected: unknown quest");
            return Err(CovenError::UnknownQuest(quest_id.to_owned()));
        };
        if let Some(active) = &self.state.active_quest_id {
            debug!(quest_id, active = %active, "start rejected: a quest is already active");
            return Err(CovenError::QuestAlreadyActive {
                active: active.clone(),
            });
        }
        if !self.state.unlocked.contains(quest_id) {
            debug!(quest_id, "start rejected: quest is locked");
            return Err(CovenError::QuestLocked(quest_id.to_owned()));
        }

        let now = self.clock.now();
        let last_phase = quest.phases.len().saturating_sub(1);
        let progress = self
            .state
            .progress
            .entry(quest_id.to_owned())
            .and_modify(|p| {
                p.attempts += 1;
                if p.state == QuestState::Completed {
                    p.current_phase_index = 0;
                    p.phases.clear();
                }
                p.state = QuestState::Active;
                p.started_at = Some(now);
                p.current_phase_index = p.current_phase_index.min(last_phase);
            })
            .or_insert_with(|| QuestProgress::first_attempt(quest_id, now));
        let attempt = progress.attempts;
        let phase_index = progress.current_phase_index;

        self.state.active_quest_id = Some(quest_id.to_owned());
        self.state.current_phase_index = phase_index;
        self.pending_advance = false;

        info!(quest_id, attempt, phase_index, "quest started");
        self.persist();
        self.pending_signals.push(BusEvent::QuestStarted {
            quest_id: quest_id.to_owned(),
            attempt,
        });
        self.notify(NotificationKind::Info, format!("Quest started: {}", quest.title));

        self.start_current_phase();
        Ok(())
    }

    /// Abandons the active quest, discarding its phase progress.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveQuest` if nothing is being played.
    pub fn cancel_quest(&mut self) -> Result<(), CovenError> {
        let Some(quest_id) = self.state.active_quest_id.clone() else {
            debug!("cancel rejected: no active quest");
            return Err(CovenError::NoActiveQuest);
        };

        if let Some(progress) = self.state.progress.get_mut(&quest_id) {
            progress.state = QuestState::Available;
            progress.current_phase_index = 0;
            progress.phases.clear();
        }
        self.state.active_quest_id = None;
        self.state.current_phase_index = 0;
        self.leave_active_phase();

        info!(quest_id = %quest_id, "quest cancelled");
        self.pending_signals.push(BusEvent::QuestCancelled {
            quest_id: quest_id.clone(),
        });
        self.notify(NotificationKind::Info, format!("Quest cancelled: {quest_id}"));
        self.persist();
        Ok(())
    }

    /// Cancels the active quest and starts it again from the first phase.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveQuest` if nothing is being played.
    pub fn restart_quest(&mut self) -> Result<(), CovenError> {
        let quest_id = self
            .state
            .active_quest_id
            .clone()
            .ok_or(CovenError::NoActiveQuest)?;
        self.cancel_quest()?;
        self.start_quest(&quest_id)
    }

    /// Re-enters the saved phase of the restored active quest.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveQuest` when nothing was active, or `UnknownQuest`
    /// when the active quest has not been loaded. In the latter case the
    /// saved quest is set back to `available` with its phase progress kept,
    /// and nothing is active afterwards.
    pub fn resume_active_quest(&mut self) -> Result<(), CovenError> {
        let Some(quest_id) = self.state.active_quest_id.clone() else {
            return Err(CovenError::NoActiveQuest);
        };
        let Some(quest) = self.state.quests.get(&quest_id).cloned() else {
            warn!(quest_id = %quest_id, "saved active quest is not loaded; releasing it");
            if let Some(progress) = self.state.progress.get_mut(&quest_id) {
                progress.state = QuestState::Available;
            }
            self.state.active_quest_id = None;
            self.state.current_phase_index = 0;
            self.persist();
            return Err(CovenError::UnknownQuest(quest_id));
        };

        let now = self.clock.now();
        let index = self
            .state
            .current_phase_index
            .min(quest.phases.len().saturating_sub(1));
        let progress = self
            .state
            .progress
            .entry(quest_id.clone())
            .or_insert_with(|| QuestProgress::first_attempt(&quest_id, now));
        progress.state = QuestState::Active;
        progress.current_phase_index = index;
        self.state.current_phase_index = index;

        info!(quest_id = %quest_id, phase_index = index, "resuming quest");
        self.notify(NotificationKind::Info, format!("Resuming quest: {}", quest.title));
        self.start_current_phase();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phases and objectives
    // ------------------------------------------------------------------

    /// Completes the current phase of the active quest.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveQuest`, `QuestNotActive`, `PhaseMismatch` or
    /// `PhaseAlreadyCompleted` without changing any state.
    pub fn complete_phase(&mut self, quest_id: &str, phase_index: usize) -> Result<(), CovenError> {
        let (quest, _) = self
            .ensure_open_phase(quest_id, phase_index)
            .inspect_err(|e| debug!(error = %e, "complete_phase rejected"))?;
        self.finish_phase(&quest, phase_index, false);
        Ok(())
    }

    /// Moves past a phase that does not advance on its own.
    ///
    /// Completes the current phase first if all of its objectives are done,
    /// then starts the next one. If a post-dialogue is showing, the next
    /// phase starts when it closes.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveQuest`, or `ObjectivesIncomplete` while objectives
    /// remain open.
    pub fn advance_phase(&mut self) -> Result<(), CovenError> {
        let (quest, index) = self.active_clone().ok_or(CovenError::NoActiveQuest)?;
        let Some(phase) = quest.phase(index) else {
            return Err(CovenError::NoActiveQuest);
        };
        let (completed, done) = self
            .phase_progress(&quest.id, &phase.id)
            .map_or((false, 0), |pp| (pp.is_completed(), pp.objectives_completed.len()));

        if completed {
            if self.dialogue.is_active() && !self.phase_dialogue_open {
                self.pending_advance = true;
            } else {
                self.enter_next_phase();
            }
            return Ok(());
        }

        let remaining = phase.objectives.len().saturating_sub(done);
        if remaining > 0 {
            debug!(phase_id = %phase.id, remaining, "advance rejected: objectives open");
            return Err(CovenError::ObjectivesIncomplete {
                phase_id: phase.id.clone(),
                remaining,
            });
        }

        self.finish_phase(&quest, index, true);
        Ok(())
    }

    /// Marks one objective of the current phase completed.
    ///
    /// Completing an already completed objective is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveQuest`, `QuestNotActive`, `PhaseMismatch`,
    /// `PhaseAlreadyCompleted` or `ObjectiveOutOfRange` without changing any
    /// state.
    pub fn complete_objective(
        &mut self,
        quest_id: &str,
        phase_index: usize,
        objective_index: usize,
    ) -> Result<(), CovenError> {
        let (quest, phase) = self
            .ensure_open_phase(quest_id, phase_index)
            .inspect_err(|e| debug!(error = %e, "complete_objective rejected"))?;
        if objective_index >= phase.objectives.len() {
            debug!(phase_id = %phase.id, objective_index, "complete_objective rejected: out of range");
            return Err(CovenError::ObjectiveOutOfRange {
                phase_id: phase.id,
                objective_index,
            });
        }

        if self.mark_objective(&quest.id, phase_index, &phase, objective_index) {
            self.persist();
            self.complete_phase_if_done(&quest, phase_index, &phase);
        }
        Ok(())
    }

    /// Validates every open objective of the current phase against one
    /// snapshot and completes the phase when none remain.
    pub fn check_current_phase_objectives(&mut self) {
        let Some((quest, index)) = self.active_clone() else {
            return;
        };
        let Some(phase) = quest.phase(index).cloned() else {
            return;
        };
        let Some(done) = self
            .phase_progress(&quest.id, &phase.id)
            .filter(|pp| !pp.is_completed())
            .map(|pp| pp.objectives_completed.clone())
        else {
            return;
        };

        if phase.objectives.is_empty() {
            if phase.auto_advance && !self.dialogue.is_active() {
                self.finish_phase(&quest, index, false);
            }
            return;
        }

        let snapshot = self.tracker.snapshot();
        let newly_met: Vec<usize> = phase
            .objectives
            .iter()
            .enumerate()
            .filter(|(i, _)| !done.contains(i))
            .filter(|(_, objective)| self.tracker.validate_objective(objective, Some(&snapshot)))
            .map(|(i, _)| i)
            .collect();
        if newly_met.is_empty() {
            return;
        }

        for objective_index in newly_met {
            self.mark_objective(&quest.id, index, &phase, objective_index);
        }
        self.persist();
        self.complete_phase_if_done(&quest, index, &phase);
    }

    /// Returns the next unused hint for the current phase, or `None` once
    /// every hint has been handed out.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveQuest` if nothing is being played.
    pub fn request_hint(&mut self) -> Result<Option<String>, CovenError> {
        let (quest, index) = self.active_clone().ok_or(CovenError::NoActiveQuest)?;
        let phase = quest.phase(index).ok_or(CovenError::NoActiveQuest)?;
        let now = self.clock.now();
        let Some(progress) = self.state.progress.get_mut(&quest.id) else {
            return Err(CovenError::NoActiveQuest);
        };
        let phase_progress = progress
            .phases
            .entry(phase.id.clone())
            .or_insert_with(|| PhaseProgress::started(now));

        let next = usize::try_from(phase_progress.hints_used).unwrap_or(usize::MAX);
        let Some(hint) = phase.hints.get(next).cloned() else {
            debug!(phase_id = %phase.id, "no hints left");
            return Ok(None);
        };
        phase_progress.hints_used += 1;
        let hints_used = phase_progress.hints_used;

        info!(phase_id = %phase.id, hints_used, "hint given");
        self.persist();
        Ok(Some(hint))
    }

    /// Explains why the player seems stuck, if they have spent more than
    /// [`STUCK_THRESHOLD_MINUTES`] on the current phase with objectives
    /// still open.
    #[must_use]
    pub fn stuck_reason(&self) -> Option<String> {
        let (quest, index) = self.state.active()?;
        let phase = quest.phase(index)?;
        let progress = self.phase_progress(&quest.id, &phase.id)?;
        if progress.is_completed() {
            return None;
        }

        let total = phase.objectives.len();
        let remaining = total.saturating_sub(progress.objectives_completed.len());
        if remaining == 0 {
            return None;
        }

        let elapsed = self.clock.now() - progress.started_at?;
        if elapsed <= Duration::minutes(STUCK_THRESHOLD_MINUTES) {
            return None;
        }

        let phase_name = if phase.title.is_empty() {
            &phase.id
        } else {
            &phase.title
        };
        Some(format!(
            "{} minutes on phase \"{phase_name}\" of \"{}\" with {remaining} of {total} objectives open",
            elapsed.num_minutes(),
            quest.title,
        ))
    }

    /// Whether [`stuck_reason`](Self::stuck_reason) has anything to say.
    #[must_use]
    pub fn is_quest_stuck(&self) -> bool {
        self.stuck_reason().is_some()
    }

    // ------------------------------------------------------------------
    // Dialogue
    // ------------------------------------------------------------------

    /// Loads and opens a standalone dialogue document, replacing whatever
    /// dialogue is showing. Returns whether it opened.
    pub async fn start_dialogue(&mut self, source: &str, content: &dyn ContentSource) -> bool {
        self.phase_dialogue_open = false;
        let opened = self.dialogue.start_dialogue(source, content).await;
        self.drain_dialogue();
        opened
    }

    /// Advances the open dialogue, remembering the phase dialogue cursor.
    pub fn advance_dialogue(&mut self) -> DialogueAdvance {
        let outcome = self.dialogue.advance();
        self.after_dialogue_step();
        outcome
    }

    /// Closes the open dialogue.
    pub fn close_dialogue(&mut self) {
        self.dialogue.close();
        self.after_dialogue_step();
    }

    // ------------------------------------------------------------------
    // Event routing
    // ------------------------------------------------------------------

    /// Reacts to one bus event. Events the manager does not consume are
    /// ignored.
    pub fn handle(&mut self, event: &BusEvent) {
        match event {
            BusEvent::DialogueClosed => self.on_dialogue_closed(),
            _ if event.is_player_action() => {
                self.tracker.observe(event);
                self.dialogue.observe(event);
                self.after_dialogue_step();
                self.check_current_phase_objectives();
            }
            _ => {}
        }
    }

    /// Events emitted since the last [`take_signals`](Self::take_signals).
    #[must_use]
    pub fn pending_signals(&self) -> &[BusEvent] {
        &self.pending_signals
    }

    /// Drains the emitted events.
    pub fn take_signals(&mut self) -> Vec<BusEvent> {
        std::mem::take(&mut self.pending_signals)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Loads saved progress from the store. Returns whether anything was
    /// restored; load and parse failures are logged.
    pub fn restore(&mut self) -> bool {
        let blob = match self.store.load() {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("no saved progress");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "progress load failed");
                return false;
            }
        };
        let snapshot = match serde_json::from_str::<ProgressSnapshot>(&blob) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "saved progress is unreadable; starting fresh");
                return false;
            }
        };

        info!(
            quests = snapshot.quests.len(),
            active = ?snapshot.active_quest_id,
            "progress restored"
        );
        self.state.apply_snapshot(snapshot);
        if self.refresh_unlocks() {
            self.persist();
        }
        true
    }

    /// Serializes all player progress.
    ///
    /// # Errors
    ///
    /// Returns `CovenError::Infrastructure` if serialization fails.
    pub fn export_progress(&self) -> Result<String, CovenError> {
        serde_json::to_string(&self.state.snapshot())
            .map_err(|e| CovenError::Infrastructure(format!("progress serialization failed: {e}")))
    }

    /// Replaces all player progress with a blob from
    /// [`export_progress`](Self::export_progress). A restored active quest
    /// is not re-entered until [`resume_active_quest`](Self::resume_active_quest).
    ///
    /// # Errors
    ///
    /// Returns `CovenError::InvalidContent` if the blob does not parse; the
    /// current progress is kept.
    pub fn import_progress(&mut self, blob: &str) -> Result<(), CovenError> {
        let snapshot: ProgressSnapshot = serde_json::from_str(blob)
            .map_err(|e| CovenError::InvalidContent(format!("progress blob: {e}")))?;

        self.leave_active_phase();
        self.state.apply_snapshot(snapshot);
        self.refresh_unlocks();
        info!(quests = self.state.progress.len(), "progress imported");
        self.persist();
        Ok(())
    }

    /// Forgets all player progress. Registered quests stay loaded.
    pub fn reset_progress(&mut self) {
        self.leave_active_phase();
        self.state.reset();
        self.refresh_unlocks();
        info!("progress reset");
        self.persist();
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The aggregate backing this manager.
    #[must_use]
    pub fn state(&self) -> &QuestEngineState {
        &self.state
    }

    /// The registered definition of `quest_id`.
    #[must_use]
    pub fn quest(&self, quest_id: &str) -> Option<Quest> {
        self.state.quests.get(quest_id).cloned()
    }

    /// The player-facing state of `quest_id`.
    #[must_use]
    pub fn quest_state(&self, quest_id: &str) -> Option<QuestState> {
        self.state.quest_state(quest_id)
    }

    /// Saved progress for `quest_id`.
    #[must_use]
    pub fn progress(&self, quest_id: &str) -> Option<QuestProgress> {
        self.state.progress.get(quest_id).cloned()
    }

    /// The active quest.
    #[must_use]
    pub fn active_quest(&self) -> Option<Quest> {
        self.state.active().map(|(quest, _)| quest.clone())
    }

    /// The active quest's id.
    #[must_use]
    pub fn active_quest_id(&self) -> Option<String> {
        self.state.active_quest_id.clone()
    }

    /// The phase being played.
    #[must_use]
    pub fn current_phase(&self) -> Option<QuestPhase> {
        let (quest, index) = self.state.active()?;
        quest.phase(index).cloned()
    }

    /// Index of the phase being played.
    #[must_use]
    pub fn current_phase_index(&self) -> Option<usize> {
        self.state.active().map(|(_, index)| index)
    }

    /// Quests that may be started right now, by id.
    #[must_use]
    pub fn available_quests(&self) -> Vec<Quest> {
        self.state
            .quests
            .values()
            .filter(|q| self.state.quest_state(&q.id) == Some(QuestState::Available))
            .cloned()
            .collect()
    }

    /// Unlocked quest ids.
    #[must_use]
    pub fn unlocked_quests(&self) -> BTreeSet<String> {
        self.state.unlocked.clone()
    }

    /// The dialogue manager.
    #[must_use]
    pub fn dialogue(&self) -> &DialogueManager {
        &self.dialogue
    }

    /// The objective tracker.
    #[must_use]
    pub fn tracker(&self) -> &ObjectiveTracker {
        &self.tracker
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn start_current_phase(&mut self) {
        let Some((quest, index)) = self.active_clone() else {
            return;
        };
        let Some(phase) = quest.phase(index).cloned() else {
            warn!(quest_id = %quest.id, phase_index = index, "phase index out of range");
            return;
        };

        let now = self.clock.now();
        let Some(progress) = self.state.progress.get_mut(&quest.id) else {
            return;
        };
        progress.current_phase_index = index;
        let phase_progress = progress
            .phases
            .entry(phase.id.clone())
            .or_insert_with(|| PhaseProgress::started(now));
        let cursor = phase_progress.dialogue_cursor;
        let already_completed = phase_progress.is_completed();

        self.pending_advance = false;
        self.phase_dialogue_open = false;
        if self.dialogue.is_active() {
            self.dialogue.close();
            self.drain_dialogue();
        }
        self.tracker.start_phase(&phase.id);

        if let Some(spec) = &phase.challenge_grid {
            self.grid.activate_challenge_grids(&spec.positions);
            self.pending_signals.push(BusEvent::QuestChallengeGrids {
                quest_id: quest.id.clone(),
                positions: spec.positions.clone(),
            });
        }

        info!(quest_id = %quest.id, phase_id = %phase.id, phase_index = index, "phase started");
        self.pending_signals.push(BusEvent::QuestPhaseStarted {
            quest_id: quest.id.clone(),
            phase_id: phase.id.clone(),
            phase_index: index,
        });
        self.persist();

        if already_completed {
            debug!(phase_id = %phase.id, "phase already completed; waiting for advance");
            return;
        }

        if cursor < phase.pre_dialogue.len() {
            let mut entries = phase.pre_dialogue.clone();
            if let Some(last) = entries.last_mut() {
                last.objectives.extend(phase.objectives.iter().cloned());
            }
            self.phase_dialogue_open = self.dialogue.start_sequence_at(entries, cursor);
            self.drain_dialogue();
        } else if phase.objectives.is_empty() && phase.auto_advance {
            self.finish_phase(&quest, index, false);
        }
    }

    /// Completes phase `index` of `quest`, then moves on: quest completion
    /// for the last phase, otherwise the next phase when the phase
    /// auto-advances or `manual` is set.
    fn finish_phase(&mut self, quest: &Quest, index: usize, manual: bool) {
        let Some(phase) = quest.phase(index) else {
            return;
        };

        let now = self.clock.now();
        if let Some(progress) = self.state.progress.get_mut(&quest.id) {
            progress
                .phases
                .entry(phase.id.clone())
                .or_insert_with(|| PhaseProgress::started(now))
                .completed_at = Some(now);
        }
        self.tracker.clear_phase();

        if self.phase_dialogue_open {
            self.phase_dialogue_open = false;
            self.dialogue.close();
            self.drain_dialogue();
        }
        if phase.challenge_grid.is_some() {
            self.grid.deactivate_all_challenge_grids();
        }

        info!(quest_id = %quest.id, phase_id = %phase.id, phase_index = index, "phase completed");
        self.pending_signals.push(BusEvent::QuestPhaseCompleted {
            quest_id: quest.id.clone(),
            phase_id: phase.id.clone(),
            phase_index: index,
        });
        let phase_name = if phase.title.is_empty() {
            &phase.id
        } else {
            &phase.title
        };
        self.notify(NotificationKind::Success, format!("Phase complete: {phase_name}"));
        self.persist();

        let post_started = !phase.post_dialogue.is_empty()
            && self.dialogue.start_sequence(phase.post_dialogue.clone());
        self.drain_dialogue();

        if quest.is_last_phase(index) {
            self.complete_quest(quest);
            return;
        }

        if phase.auto_advance || manual {
            if post_started {
                self.pending_advance = true;
            } else {
                self.enter_next_phase();
            }
        } else {
            debug!(phase_id = %phase.id, "waiting for manual advance");
        }
    }

    fn enter_next_phase(&mut self) {
        self.pending_advance = false;
        let Some(quest_id) = self.state.active_quest_id.clone() else {
            return;
        };
        self.state.current_phase_index += 1;
        if let Some(progress) = self.state.progress.get_mut(&quest_id) {
            progress.current_phase_index = self.state.current_phase_index;
        }
        self.start_current_phase();
    }

    fn complete_quest(&mut self, quest: &Quest) {
        let now = self.clock.now();
        if let Some(progress) = self.state.progress.get_mut(&quest.id) {
            progress.state = QuestState::Completed;
            progress.completed_at = Some(now);
        }
        self.state.active_quest_id = None;
        self.state.current_phase_index = 0;
        self.pending_advance = false;

        info!(quest_id = %quest.id, "quest completed");
        self.pending_signals.push(BusEvent::QuestCompleted {
            quest_id: quest.id.clone(),
        });
        self.notify(
            NotificationKind::Success,
            format!("Quest complete: {}", quest.title),
        );

        for reward in &quest.rewards {
            self.pending_signals
                .extend(rewards::grant_events(&quest.id, reward));
            if let Reward::UnlockQuest { quest_id } = reward {
                self.unlock(quest_id);
            }
        }
        self.refresh_unlocks();
        self.persist();
    }

    /// Inserts `objective_index` into the phase's completed set. Returns
    /// whether it was newly completed.
    fn mark_objective(
        &mut self,
        quest_id: &str,
        phase_index: usize,
        phase: &QuestPhase,
        objective_index: usize,
    ) -> bool {
        let now = self.clock.now();
        let Some(progress) = self.state.progress.get_mut(quest_id) else {
            return false;
        };
        let inserted = progress
            .phases
            .entry(phase.id.clone())
            .or_insert_with(|| PhaseProgress::started(now))
            .objectives_completed
            .insert(objective_index);
        if !inserted {
            return false;
        }

        let description = phase
            .objectives
            .get(objective_index)
            .map(|o| o.description.clone())
            .unwrap_or_default();
        info!(quest_id, phase_index, objective_index, description = %description, "objective completed");
        self.pending_signals.push(BusEvent::QuestObjectiveCompleted {
            quest_id: quest_id.to_owned(),
            phase_index,
            objective_index,
            description,
        });
        true
    }

    fn complete_phase_if_done(&mut self, quest: &Quest, index: usize, phase: &QuestPhase) {
        let all_done = self
            .phase_progress(&quest.id, &phase.id)
            .is_some_and(|pp| {
                !pp.is_completed() && pp.objectives_completed.len() >= phase.objectives.len()
            });
        if all_done {
            self.finish_phase(quest, index, false);
        }
    }

    fn on_dialogue_closed(&mut self) {
        if self.dialogue.is_active() {
            debug!("dialogue-closed for a replaced dialogue ignored");
            return;
        }
        self.phase_dialogue_open = false;

        if self.pending_advance {
            self.enter_next_phase();
            return;
        }

        if let Some((quest, index)) = self.state.active() {
            if let Some(phase) = quest.phase(index) {
                let open = self
                    .phase_progress(&quest.id, &phase.id)
                    .is_some_and(|pp| !pp.is_completed());
                if let Some(spec) = phase.challenge_grid.as_ref().filter(|_| open) {
                    self.grid.activate_challenge_grids(&spec.positions);
                }
            }
        }
        self.check_current_phase_objectives();
    }

    /// Unlocks every registered quest whose prerequisites are all
    /// completed. Returns whether anything changed.
    fn refresh_unlocks(&mut self) -> bool {
        let eligible: Vec<String> = self
            .state
            .quests
            .values()
            .filter(|q| !self.state.unlocked.contains(&q.id) && self.state.prerequisites_met(q))
            .map(|q| q.id.clone())
            .collect();
        for quest_id in &eligible {
            self.unlock(quest_id);
        }
        !eligible.is_empty()
    }

    fn unlock(&mut self, quest_id: &str) -> bool {
        if !self.state.unlocked.insert(quest_id.to_owned()) {
            return false;
        }
        info!(quest_id, "quest unlocked");
        self.pending_signals.push(BusEvent::QuestUnlocked {
            quest_id: quest_id.to_owned(),
        });
        true
    }

    fn leave_active_phase(&mut self) {
        let had_active = self.state.active_quest_id.is_some();
        self.phase_dialogue_open = false;
        self.pending_advance = false;
        self.dialogue.close();
        self.drain_dialogue();
        self.tracker.clear_phase();
        if had_active || !self.grid.challenge_grid_positions().is_empty() {
            self.grid.deactivate_all_challenge_grids();
        }
    }

    fn ensure_open_phase(
        &self,
        quest_id: &str,
        phase_index: usize,
    ) -> Result<(Quest, QuestPhase), CovenError> {
        let active = self
            .state
            .active_quest_id
            .as_deref()
            .ok_or(CovenError::NoActiveQuest)?;
        if active != quest_id {
            return Err(CovenError::QuestNotActive(quest_id.to_owned()));
        }
        if phase_index != self.state.current_phase_index {
            return Err(CovenError::PhaseMismatch {
                current: self.state.current_phase_index,
                requested: phase_index,
            });
        }
        let quest = self
            .state
            .quests
            .get(quest_id)
            .cloned()
            .ok_or_else(|| CovenError::UnknownQuest(quest_id.to_owned()))?;
        let phase = quest
            .phase(phase_index)
            .cloned()
            .ok_or(CovenError::PhaseMismatch {
                current: self.state.current_phase_index,
                requested: phase_index,
            })?;
        if self
            .phase_progress(quest_id, &phase.id)
            .is_some_and(PhaseProgress::is_completed)
        {
            return Err(CovenError::PhaseAlreadyCompleted(phase.id));
        }
        Ok((quest, phase))
    }

    fn phase_progress(&self, quest_id: &str, phase_id: &str) -> Option<&PhaseProgress> {
        self.state.progress.get(quest_id)?.phases.get(phase_id)
    }

    fn active_clone(&self) -> Option<(Quest, usize)> {
        self.state
            .active()
            .map(|(quest, index)| (quest.clone(), index))
    }

    fn after_dialogue_step(&mut self) {
        self.drain_dialogue();
        self.sync_dialogue_cursor();
    }

    fn drain_dialogue(&mut self) {
        self.pending_signals.extend(self.dialogue.take_signals());
    }

    /// Copies the pre-dialogue position into phase progress so a restored
    /// session resumes where the player left off.
    fn sync_dialogue_cursor(&mut self) {
        if !self.phase_dialogue_open {
            return;
        }
        let Some((quest_id, phase_id, entry_count)) = self.state.active().and_then(|(quest, index)| {
            quest
                .phase(index)
                .map(|phase| (quest.id.clone(), phase.id.clone(), phase.pre_dialogue.len()))
        }) else {
            self.phase_dialogue_open = false;
            return;
        };

        let cursor = if let Some(index) = self.dialogue.current_index() {
            index
        } else {
            self.phase_dialogue_open = false;
            entry_count
        };

        let changed = self
            .state
            .progress
            .get_mut(&quest_id)
            .and_then(|p| p.phases.get_mut(&phase_id))
            .is_some_and(|pp| {
                let changed = pp.dialogue_cursor != cursor;
                pp.dialogue_cursor = cursor;
                changed
            });
        if changed {
            self.persist();
        }
    }

    fn notify(&mut self, kind: NotificationKind, message: String) {
        self.pending_signals
            .push(BusEvent::QuestNotification { kind, message });
    }

    fn persist(&self) {
        let blob = match self.export_progress() {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "progress not saved");
                return;
            }
        };
        if let Err(e) = self.store.save(&blob) {
            warn!(error = %e, "progress save failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use coven_content::application::loader::parse_quest;
    use coven_test_support::{
        FailingProgressStore, InMemoryGrid, MemoryProgressStore, RecordingCamera, SteppingClock,
    };
    use serde_json::json;

    use super::*;

    struct Fixture {
        clock: Arc<SteppingClock>,
        store: Arc<MemoryProgressStore>,
        manager: QuestManager,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2026, 2, 1, 18, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryProgressStore::new());
        let manager = QuestManager::new(
            clock.clone(),
            Arc::new(InMemoryGrid::new()),
            Arc::new(RecordingCamera::new()),
            store.clone(),
        );
        Fixture {
            clock,
            store,
            manager,
        }
    }

    fn loaded(json: &serde_json::Value) -> LoadedQuest {
        parse_quest(&json.to_string()).unwrap()
    }

    fn play_quest(id: &str, prerequisites: &[&str]) -> LoadedQuest {
        loaded(&json!({
            "id": id,
            "title": format!("Quest {id}"),
            "prerequisites": prerequisites,
            "phases": [{
                "id": "press",
                "title": "Press play",
                "objectives": [
                    {"description": "Open the terminal", "type": "open_terminal"},
                    {"description": "Press play", "type": "play_button"}
                ],
                "hints": ["Click the terminal icon", "Then press the green button"]
            }]
        }))
    }

    #[test]
    fn test_register_unlocks_quest_without_prerequisites() {
        // Arrange
        let mut f = fixture();

        // Act
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        f.manager.register_quest(play_quest("b", &["a"])).unwrap();

        // Assert
        assert_eq!(f.manager.quest_state("a"), Some(QuestState::Available));
        assert_eq!(f.manager.quest_state("b"), Some(QuestState::Locked));
        let names: Vec<_> = f.manager.take_signals().iter().map(BusEvent::name).collect();
        assert_eq!(names, vec!["quest-loaded", "quest-unlocked", "quest-loaded"]);
    }

    #[test]
    fn test_start_rejects_unknown_and_locked_quests_without_mutation() {
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        f.manager.register_quest(play_quest("b", &["a"])).unwrap();
        f.manager.take_signals();
        let saves = f.store.save_count();

        assert!(matches!(
            f.manager.start_quest("nope"),
            Err(CovenError::UnknownQuest(_))
        ));
        assert!(matches!(
            f.manager.start_quest("b"),
            Err(CovenError::QuestLocked(_))
        ));
        assert!(f.manager.progress("b").is_none());
        assert!(f.manager.take_signals().is_empty());
        assert_eq!(f.store.save_count(), saves);
    }

    #[test]
    fn test_start_while_active_fails_and_leaves_both_quests_unchanged() {
        // Arrange
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        f.manager.register_quest(play_quest("c", &[])).unwrap();
        f.manager.start_quest("a").unwrap();
        let before_a = f.manager.progress("a");

        // Act
        let result = f.manager.start_quest("c");

        // Assert
        assert!(matches!(
            result,
            Err(CovenError::QuestAlreadyActive { ref active }) if active == "a"
        ));
        assert_eq!(f.manager.progress("a"), before_a);
        assert!(f.manager.progress("c").is_none());
        assert_eq!(f.manager.active_quest_id().as_deref(), Some("a"));
    }

    #[test]
    fn test_complete_objective_guards() {
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();

        assert!(matches!(
            f.manager.complete_objective("a", 0, 0),
            Err(CovenError::NoActiveQuest)
        ));

        f.manager.start_quest("a").unwrap();

        assert!(matches!(
            f.manager.complete_objective("b", 0, 0),
            Err(CovenError::QuestNotActive(_))
        ));
        assert!(matches!(
            f.manager.complete_objective("a", 1, 0),
            Err(CovenError::PhaseMismatch {
                current: 0,
                requested: 1
            })
        ));
        assert!(matches!(
            f.manager.complete_objective("a", 0, 5),
            Err(CovenError::ObjectiveOutOfRange {
                objective_index: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_second_objective_alone_does_not_complete_phase() {
        // Arrange
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        f.manager.start_quest("a").unwrap();
        f.manager.take_signals();

        // Act
        f.manager.complete_objective("a", 0, 1).unwrap();
        f.manager.complete_objective("a", 0, 1).unwrap();

        // Assert
        let names: Vec<_> = f.manager.take_signals().iter().map(BusEvent::name).collect();
        assert_eq!(names, vec!["quest-objective-completed"]);
        assert_eq!(f.manager.quest_state("a"), Some(QuestState::Active));
    }

    #[test]
    fn test_advance_phase_rejects_open_objectives() {
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        f.manager.start_quest("a").unwrap();

        let result = f.manager.advance_phase();

        assert!(matches!(
            result,
            Err(CovenError::ObjectivesIncomplete { remaining: 2, .. })
        ));
    }

    #[test]
    fn test_request_hint_hands_out_hints_in_order() {
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        f.manager.start_quest("a").unwrap();

        let first = f.manager.request_hint().unwrap();
        let second = f.manager.request_hint().unwrap();
        let third = f.manager.request_hint().unwrap();

        assert_eq!(first.as_deref(), Some("Click the terminal icon"));
        assert_eq!(second.as_deref(), Some("Then press the green button"));
        assert_eq!(third, None);
        let progress = f.manager.progress("a").unwrap();
        assert_eq!(progress.phases["press"].hints_used, 2);
    }

    #[test]
    fn test_stuck_after_ten_minutes_with_open_objectives() {
        // Arrange
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        f.manager.start_quest("a").unwrap();

        // Act / Assert
        f.clock.advance(Duration::minutes(10));
        assert!(!f.manager.is_quest_stuck());

        f.clock.advance(Duration::minutes(2));
        let reason = f.manager.stuck_reason().unwrap();
        assert!(reason.contains("12 minutes"));
        assert!(reason.contains("Press play"));
        assert!(reason.contains("2 of 2"));
    }

    #[test]
    fn test_no_active_quest_is_never_stuck() {
        let f = fixture();

        assert_eq!(f.manager.stuck_reason(), None);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        let after_register = f.store.save_count();

        f.manager.start_quest("a").unwrap();
        let after_start = f.store.save_count();
        f.manager.complete_objective("a", 0, 0).unwrap();

        assert!(after_register >= 1);
        assert!(after_start > after_register);
        assert!(f.store.save_count() > after_start);
        let blob = f.store.blob().unwrap();
        assert!(blob.contains("\"activeQuestId\":\"a\""));
    }

    #[test]
    fn test_persistence_failure_does_not_roll_back_progress() {
        // Arrange
        let mut manager = QuestManager::new(
            Arc::new(SteppingClock::new(Utc::now())),
            Arc::new(InMemoryGrid::new()),
            Arc::new(RecordingCamera::new()),
            Arc::new(FailingProgressStore),
        );
        manager.register_quest(play_quest("a", &[])).unwrap();

        // Act
        manager.start_quest("a").unwrap();

        // Assert
        assert_eq!(manager.quest_state("a"), Some(QuestState::Active));
        assert!(!manager.restore());
    }

    #[test]
    fn test_starting_again_after_cancel_stamps_a_new_start_time() {
        // Arrange
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        f.manager.start_quest("a").unwrap();
        let first_start = f.clock.now();
        f.manager.cancel_quest().unwrap();
        f.clock.advance(Duration::minutes(30));

        // Act
        f.manager.start_quest("a").unwrap();

        // Assert
        let progress = f.manager.progress("a").unwrap();
        assert_eq!(progress.attempts, 2);
        assert_eq!(progress.started_at, Some(first_start + Duration::minutes(30)));
    }

    #[test]
    fn test_resuming_an_unloaded_quest_releases_the_active_pointer() {
        // Arrange
        let mut saved = fixture();
        saved.manager.register_quest(play_quest("a", &[])).unwrap();
        saved.manager.start_quest("a").unwrap();
        saved.manager.complete_objective("a", 0, 0).unwrap();
        let blob = saved.store.blob().unwrap();

        let store = Arc::new(MemoryProgressStore::with_blob(blob));
        let mut manager = QuestManager::new(
            Arc::new(SteppingClock::new(Utc::now())),
            Arc::new(InMemoryGrid::new()),
            Arc::new(RecordingCamera::new()),
            store.clone(),
        );
        assert!(manager.restore());
        manager.register_quest(play_quest("b", &[])).unwrap();

        // Act
        let result = manager.resume_active_quest();

        // Assert
        assert!(matches!(result, Err(CovenError::UnknownQuest(ref id)) if id == "a"));
        assert_eq!(manager.active_quest_id(), None);
        let progress = manager.progress("a").unwrap();
        assert_eq!(progress.state, QuestState::Available);
        assert_eq!(progress.phases["press"].objectives_completed.len(), 1);
        assert!(store.blob().unwrap().contains("\"activeQuestId\":null"));
        manager.start_quest("b").unwrap();
        assert_eq!(manager.active_quest_id().as_deref(), Some("b"));
    }

    #[test]
    fn test_import_rejects_garbage_and_keeps_progress() {
        let mut f = fixture();
        f.manager.register_quest(play_quest("a", &[])).unwrap();
        f.manager.start_quest("a").unwrap();

        let result = f.manager.import_progress("{not json");

        assert!(matches!(result, Err(CovenError::InvalidContent(_))));
        assert_eq!(f.manager.active_quest_id().as_deref(), Some("a"));
    }
}
