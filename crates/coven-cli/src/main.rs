//! Binary Coven headless runner entry point.

use std::error::Error;

use coven_cli::config::Config;
use coven_cli::runner;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Binary Coven runner");

    // Read configuration from environment.
    let config = Config::from_env()?;

    let summary = runner::run(&config).await?;
    tracing::info!(
        quests_loaded = summary.quests_loaded,
        events_emitted = summary.events_emitted,
        active_quest = ?summary.active_quest,
        completed = ?summary.completed_quests,
        "run finished"
    );

    Ok(())
}
