//! Runner configuration read from the environment.

use std::path::PathBuf;

use crate::error::AppError;

const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_PROGRESS_PATH: &str = "coven-progress.json";

/// Everything the runner needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root for quest and dialogue documents (`COVEN_CONTENT_DIR`).
    pub content_dir: PathBuf,
    /// Progress save file (`COVEN_PROGRESS_PATH`).
    pub progress_path: PathBuf,
    /// Quest sources to load, relative to the content dir (`COVEN_QUESTS`,
    /// comma separated). Empty means every `quests/*.json`.
    pub quests: Vec<String>,
    /// Quest to start when nothing is active (`COVEN_START_QUEST`).
    pub start_quest: Option<String>,
    /// JSON-lines action script to replay (`COVEN_SCRIPT`).
    pub script: Option<PathBuf>,
    /// Grid state file (`COVEN_GRID_PATH`).
    pub grid_path: Option<PathBuf>,
}

impl Config {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a variable is set but unusable.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Blank values count as
    /// unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when `COVEN_QUESTS` is set but names no
    /// quest.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let quests = match lookup("COVEN_QUESTS") {
            Some(raw) => {
                let quests: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect();
                if quests.is_empty() {
                    return Err(AppError::Config(
                        "COVEN_QUESTS is set but names no quest".to_owned(),
                    ));
                }
                quests
            }
            None => Vec::new(),
        };

        Ok(Self {
            content_dir: get("COVEN_CONTENT_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR), PathBuf::from),
            progress_path: get("COVEN_PROGRESS_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_PROGRESS_PATH), PathBuf::from),
            quests,
            start_quest: get("COVEN_START_QUEST"),
            script: get("COVEN_SCRIPT").map(PathBuf::from),
            grid_path: get("COVEN_GRID_PATH").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.content_dir, PathBuf::from("content"));
        assert_eq!(config.progress_path, PathBuf::from("coven-progress.json"));
        assert!(config.quests.is_empty());
        assert_eq!(config.start_quest, None);
        assert_eq!(config.script, None);
    }

    #[test]
    fn test_quest_list_is_split_and_trimmed() {
        let config = Config::from_lookup(lookup(&[
            ("COVEN_QUESTS", " quests/intro, quests/farming ,"),
            ("COVEN_START_QUEST", "intro"),
            ("COVEN_SCRIPT", "run.jsonl"),
        ]))
        .unwrap();

        assert_eq!(config.quests, vec!["quests/intro", "quests/farming"]);
        assert_eq!(config.start_quest.as_deref(), Some("intro"));
        assert_eq!(config.script, Some(PathBuf::from("run.jsonl")));
    }

    #[test]
    fn test_empty_quest_list_is_rejected() {
        let result = Config::from_lookup(lookup(&[("COVEN_QUESTS", " , ")]));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[("COVEN_CONTENT_DIR", "  ")])).unwrap();

        assert_eq!(config.content_dir, PathBuf::from("content"));
    }
}
