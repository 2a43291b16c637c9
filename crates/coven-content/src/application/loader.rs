//! Parsing and validation of content documents.

use std::collections::HashSet;

use coven_core::error::CovenError;
use sha2::{Digest, Sha256};

use crate::domain::dialogue::{DialogueDocument, DialogueEntry};
use crate::domain::quest::Quest;

/// A validated quest together with the hash of the document it came from.
#[derive(Debug, Clone)]
pub struct LoadedQuest {
    /// The quest definition.
    pub quest: Quest,
    /// Lower-case hex SHA-256 of the source text.
    pub content_hash: String,
}

/// Returns the lower-case hex SHA-256 of `raw`.
#[must_use]
pub fn content_hash(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

/// Checks the structural rules every registered quest must satisfy.
///
/// # Errors
///
/// Returns `CovenError::InvalidContent` when the id or title is blank, the
/// phase list is empty, or two phases share an id.
pub fn validate_quest(quest: &Quest) -> Result<(), CovenError> {
    if quest.id.trim().is_empty() {
        return Err(CovenError::InvalidContent("quest id is empty".to_owned()));
    }
    if quest.title.trim().is_empty() {
        return Err(CovenError::InvalidContent(format!(
            "quest {} has an empty title",
            quest.id
        )));
    }
    if quest.phases.is_empty() {
        return Err(CovenError::InvalidContent(format!(
            "quest {} has no phases",
            quest.id
        )));
    }

    let mut seen = HashSet::new();
    for phase in &quest.phases {
        if !seen.insert(phase.id.as_str()) {
            return Err(CovenError::InvalidContent(format!(
                "quest {} repeats phase id {}",
                quest.id, phase.id
            )));
        }
    }
    Ok(())
}

/// Parses and validates a quest document.
///
/// # Errors
///
/// Returns `CovenError::InvalidContent` if the JSON does not match the quest
/// shape or fails [`validate_quest`].
pub fn parse_quest(raw: &str) -> Result<LoadedQuest, CovenError> {
    let quest: Quest = serde_json::from_str(raw)
        .map_err(|e| CovenError::InvalidContent(format!("quest parse failed: {e}")))?;
    validate_quest(&quest)?;
    Ok(LoadedQuest {
        quest,
        content_hash: content_hash(raw),
    })
}

/// Parses a dialogue document into its entries.
///
/// # Errors
///
/// Returns `CovenError::InvalidContent` if the JSON does not match the
/// dialogue shape or contains no entries.
pub fn parse_dialogue(raw: &str) -> Result<Vec<DialogueEntry>, CovenError> {
    let document: DialogueDocument = serde_json::from_str(raw)
        .map_err(|e| CovenError::InvalidContent(format!("dialogue parse failed: {e}")))?;
    if document.entries.is_empty() {
        return Err(CovenError::InvalidContent(format!(
            "dialogue {} has no entries",
            document.id.as_deref().unwrap_or("<unnamed>")
        )));
    }
    Ok(document.entries)
}
