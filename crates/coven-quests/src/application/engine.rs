//! The process-wide quest context.

use std::collections::VecDeque;
use std::sync::Arc;

use coven_content::application::loader::parse_quest;
use coven_core::content::ContentSource;
use coven_core::error::CovenError;
use coven_core::event::{BusEvent, EventBus};
use coven_dialogue::application::manager::DialogueAdvance;
use tracing::{debug, warn};

use super::manager::QuestManager;

/// Owns the quest manager and connects it to the bus and content.
///
/// Every operation drains what the manager emitted, publishes each event on
/// the bus and routes it back into the manager until nothing is left.
pub struct QuestEngine {
    manager: QuestManager,
    bus: Arc<dyn EventBus>,
    content: Arc<dyn ContentSource>,
}

impl std::fmt::Debug for QuestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestEngine")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl QuestEngine {
    /// Wraps `manager`.
    #[must_use]
    pub fn new(
        manager: QuestManager,
        bus: Arc<dyn EventBus>,
        content: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            manager,
            bus,
            content,
        }
    }

    /// Read access to the manager.
    #[must_use]
    pub fn manager(&self) -> &QuestManager {
        &self.manager
    }

    /// Fetches, validates and registers one quest document. Returns the
    /// quest id, or `None` when the document could not be loaded.
    pub async fn load_quest(&mut self, source: &str) -> Option<String> {
        let raw = match self.content.fetch(source).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(source, error = %e, "quest fetch failed");
                return None;
            }
        };
        let loaded = match parse_quest(&raw) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(source, error = %e, "quest rejected");
                return None;
            }
        };

        let quest_id = loaded.quest.id.clone();
        let registered = self.manager.register_quest(loaded);
        self.pump();
        match registered {
            Ok(()) => Some(quest_id),
            Err(e) => {
                warn!(source, error = %e, "quest rejected");
                None
            }
        }
    }

    /// Loads each source in order. Returns the ids that loaded.
    pub async fn load_quests<S: AsRef<str>>(&mut self, sources: &[S]) -> Vec<String> {
        let mut loaded = Vec::with_capacity(sources.len());
        for source in sources {
            if let Some(quest_id) = self.load_quest(source.as_ref()).await {
                loaded.push(quest_id);
            }
        }
        loaded
    }

    /// Feeds one event from the game into the quest core.
    pub async fn dispatch(&mut self, event: BusEvent) {
        debug!(event = event.name(), "dispatch");
        if let BusEvent::StartDialogue { source } = &event {
            let content = Arc::clone(&self.content);
            self.manager.start_dialogue(source, content.as_ref()).await;
        } else {
            self.manager.handle(&event);
        }
        self.pump();
    }

    /// See [`QuestManager::start_quest`].
    ///
    /// # Errors
    ///
    /// Propagates the manager's rejection.
    pub fn start_quest(&mut self, quest_id: &str) -> Result<(), CovenError> {
        let result = self.manager.start_quest(quest_id);
        self.pump();
        result
    }

    /// See [`QuestManager::cancel_quest`].
    ///
    /// # Errors
    ///
    /// Propagates the manager's rejection.
    pub fn cancel_quest(&mut self) -> Result<(), CovenError> {
        let result = self.manager.cancel_quest();
        self.pump();
        result
    }

    /// See [`QuestManager::restart_quest`].
    ///
    /// # Errors
    ///
    /// Propagates the manager's rejection.
    pub fn restart_quest(&mut self) -> Result<(), CovenError> {
        let result = self.manager.restart_quest();
        self.pump();
        result
    }

    /// See [`QuestManager::complete_phase`].
    ///
    /// # Errors
    ///
    /// Propagates the manager's rejection.
    pub fn complete_phase(&mut self, quest_id: &str, phase_index: usize) -> Result<(), CovenError> {
        let result = self.manager.complete_phase(quest_id, phase_index);
        self.pump();
        result
    }

    /// See [`QuestManager::complete_objective`].
    ///
    /// # Errors
    ///
    /// Propagates the manager's rejection.
    pub fn complete_objective(
        &mut self,
        quest_id: &str,
        phase_index: usize,
        objective_index: usize,
    ) -> Result<(), CovenError> {
        let result = self
            .manager
            .complete_objective(quest_id, phase_index, objective_index);
        self.pump();
        result
    }

    /// See [`QuestManager::advance_phase`].
    ///
    /// # Errors
    ///
    /// Propagates the manager's rejection.
    pub fn advance_phase(&mut self) -> Result<(), CovenError> {
        let result = self.manager.advance_phase();
        self.pump();
        result
    }

    /// Re-runs objective validation for the current phase.
    pub fn check_current_phase_objectives(&mut self) {
        self.manager.check_current_phase_objectives();
        self.pump();
    }

    /// See [`QuestManager::advance_dialogue`].
    pub fn advance_dialogue(&mut self) -> DialogueAdvance {
        let outcome = self.manager.advance_dialogue();
        self.pump();
        outcome
    }

    /// See [`QuestManager::close_dialogue`].
    pub fn close_dialogue(&mut self) {
        self.manager.close_dialogue();
        self.pump();
    }

    /// See [`QuestManager::request_hint`].
    ///
    /// # Errors
    ///
    /// Propagates the manager's rejection.
    pub fn request_hint(&mut self) -> Result<Option<String>, CovenError> {
        self.manager.request_hint()
    }

    /// Reads saved progress once at startup. Returns whether anything was
    /// restored.
    ///
    /// Call this before loading content: registering a quest saves the
    /// unlock set and would overwrite an unread save.
    pub fn restore(&mut self) -> bool {
        let restored = self.manager.restore();
        self.pump();
        restored
    }

    /// See [`QuestManager::resume_active_quest`].
    ///
    /// # Errors
    ///
    /// Propagates the manager's rejection.
    pub fn resume_active_quest(&mut self) -> Result<(), CovenError> {
        let result = self.manager.resume_active_quest();
        self.pump();
        result
    }

    /// See [`QuestManager::export_progress`].
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn export_progress(&self) -> Result<String, CovenError> {
        self.manager.export_progress()
    }

    /// See [`QuestManager::import_progress`].
    ///
    /// # Errors
    ///
    /// Propagates the manager's rejection.
    pub fn import_progress(&mut self, blob: &str) -> Result<(), CovenError> {
        let result = self.manager.import_progress(blob);
        self.pump();
        result
    }

    /// See [`QuestManager::reset_progress`].
    pub fn reset_progress(&mut self) {
        self.manager.reset_progress();
        self.pump();
    }

    fn pump(&mut self) {
        let mut queue: VecDeque<BusEvent> = self.manager.take_signals().into();
        while let Some(event) = queue.pop_front() {
            self.bus.emit(&event);
            self.manager.handle(&event);
            queue.extend(self.manager.take_signals());
        }
    }
}
