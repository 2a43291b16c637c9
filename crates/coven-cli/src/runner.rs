//! Wires the quest core to files and replays a script.

use std::path::Path;
use std::sync::Arc;

use coven_content::application::file_source::FileContentSource;
use coven_core::clock::SystemClock;
use coven_dialogue::application::manager::DialogueAdvance;
use coven_progress_store::JsonFileProgressStore;
use coven_quests::application::engine::QuestEngine;
use coven_quests::application::manager::QuestManager;
use coven_quests::domain::progress::QuestState;
use tracing::{debug, info, warn};

use crate::adapters::{FileGrid, LoggingCamera, LoggingEventBus};
use crate::config::Config;
use crate::error::AppError;
use crate::script::{Command, ScriptStep, parse_script};

/// What a run ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Quests that loaded.
    pub quests_loaded: usize,
    /// Events published on the bus.
    pub events_emitted: usize,
    /// The quest still being played.
    pub active_quest: Option<String>,
    /// Completed quest ids.
    pub completed_quests: Vec<String>,
}

/// Runs the quest core once against `config`.
///
/// # Errors
///
/// Returns an error if the grid file or script cannot be read or parsed,
/// the quest directory cannot be listed, or the configured start quest is
/// rejected. Rejected script steps are logged and skipped.
pub async fn run(config: &Config) -> Result<RunSummary, AppError> {
    let grid = Arc::new(match &config.grid_path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path).await?;
            FileGrid::from_json(&raw, &path.display().to_string())?
        }
        None => FileGrid::new(),
    });
    let bus = Arc::new(LoggingEventBus::new());
    let manager = QuestManager::new(
        Arc::new(SystemClock),
        grid.clone(),
        Arc::new(LoggingCamera),
        Arc::new(JsonFileProgressStore::new(&config.progress_path)),
    );
    let mut engine = QuestEngine::new(
        manager,
        bus.clone(),
        Arc::new(FileContentSource::new(&config.content_dir)),
    );

    engine.restore();

    let sources = if config.quests.is_empty() {
        discover_quests(&config.content_dir).await?
    } else {
        config.quests.clone()
    };
    let loaded = engine.load_quests(&sources).await;
    info!(requested = sources.len(), loaded = loaded.len(), "quests loaded");

    if engine.manager().active_quest_id().is_some() {
        if let Err(e) = engine.resume_active_quest() {
            warn!(error = %e, "could not resume saved quest");
        }
    } else if let Some(quest_id) = &config.start_quest {
        engine.start_quest(quest_id)?;
    }

    if let Some(path) = &config.script {
        let raw = tokio::fs::read_to_string(path).await?;
        let steps = parse_script(&raw, &path.display().to_string())?;
        info!(steps = steps.len(), "replaying script");
        for step in steps {
            run_step(&mut engine, &grid, step).await;
        }
    }

    if let Some(reason) = engine.manager().stuck_reason() {
        info!(reason = %reason, "player looks stuck");
    }

    let state = engine.manager().state();
    let completed_quests = state
        .progress
        .values()
        .filter(|p| p.state == QuestState::Completed)
        .map(|p| p.quest_id.clone())
        .collect();
    Ok(RunSummary {
        quests_loaded: loaded.len(),
        events_emitted: bus.emitted(),
        active_quest: engine.manager().active_quest_id(),
        completed_quests,
    })
}

async fn run_step(engine: &mut QuestEngine, grid: &FileGrid, step: ScriptStep) {
    let command = match step {
        ScriptStep::Event(event) => {
            engine.dispatch(event).await;
            return;
        }
        ScriptStep::Command(command) => command,
    };

    debug!(?command, "script command");
    let result = match command {
        Command::StartQuest { quest_id } => engine.start_quest(&quest_id),
        Command::CancelQuest => engine.cancel_quest(),
        Command::RestartQuest => engine.restart_quest(),
        Command::AdvancePhase => engine.advance_phase(),
        Command::AdvanceDialogue => {
            if engine.advance_dialogue() == DialogueAdvance::AwaitingRequirement {
                info!("dialogue waiting for the player");
            }
            Ok(())
        }
        Command::CloseDialogue => {
            engine.close_dialogue();
            Ok(())
        }
        Command::RequestHint => engine.request_hint().map(|hint| match hint {
            Some(hint) => info!(hint = %hint, "hint"),
            None => info!("no hints left"),
        }),
        Command::PlantReady {
            position,
            plant_type,
        } => {
            grid.plant_ready(position, &plant_type);
            engine.check_current_phase_objectives();
            Ok(())
        }
        Command::ExportProgress => engine
            .export_progress()
            .map(|blob| info!(progress = %blob, "progress export")),
    };

    if let Err(e) = result {
        warn!(error = %e, "script step rejected");
    }
}

/// Lists `quests/*.json` under `content_dir` as content sources, sorted.
async fn discover_quests(content_dir: &Path) -> Result<Vec<String>, AppError> {
    let dir = content_dir.join("quests");
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "no quest directory");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut sources = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                sources.push(format!("quests/{stem}"));
            }
        }
    }
    sources.sort();
    Ok(sources)
}
