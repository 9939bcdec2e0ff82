//! Kriegspiel Agent Host
//!
//! Loads the native agent library, registers it, reports which agents can
//! play Kriegspiel and, given a position file, asks the agent for one move:
//!
//! ```text
//! kriegspiel-agent-host [--library NAME] [--lib-dir DIR] [--position FILE]
//! ```
//!
//! `KRIEGSPIEL_LIBRARY` and `KRIEGSPIEL_LIBRARY_PATH` set the same options;
//! flags win over the environment. Logs go to stderr (`RUST_LOG`, default
//! `info`), the chosen move to stdout as JSON.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use kriegspiel_bridge::{AgentRegistry, BridgeConfig, register_native_agent, select_with_watchdog};
use kriegspiel_core::{
    Agent, BridgeError, DecisionBudget, GameDescriptor, Move, StateSnapshot,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "kriegspiel-agent-host", version, about)]
struct Args {
    /// Logical name of the agent library, without prefix or extension
    #[arg(long, env = "KRIEGSPIEL_LIBRARY")]
    library: Option<String>,

    /// Directory to load the agent library from
    #[arg(long, env = "KRIEGSPIEL_LIBRARY_PATH")]
    lib_dir: Option<PathBuf>,

    /// JSON position file to play one decision from
    #[arg(long)]
    position: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut BridgeConfig) {
        if let Some(library) = self.library.as_ref().filter(|v| !v.is_empty()) {
            config.library_name = library.clone();
        }
        if let Some(dir) = &self.lib_dir {
            config.search_path = Some(dir.clone());
        }
    }
}

/// One decision request read from `--position`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PositionFile {
    #[serde(default = "GameDescriptor::kriegspiel")]
    game: GameDescriptor,
    state: StateSnapshot,
    player: u32,
    #[serde(default)]
    budget: DecisionBudget,
}

/// What gets printed for a decision
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Decision {
    agent: String,
    player: u32,
    #[serde(rename = "Move")]
    chosen: Move,
    state_hash: String,
}

/// Initialize an agent, play one decision under the watchdog and close it
async fn play(
    registry: &AgentRegistry,
    name: &str,
    position: PositionFile,
    grace: Duration,
) -> Result<Decision> {
    let PositionFile {
        game,
        state,
        player,
        budget,
    } = position;
    let state_hash = state.state_hash()?;
    info!(
        "Deciding for P{} in {} (state {}, {} tries offered)",
        player,
        game.name,
        &state_hash[..12],
        state.legal_moves.len()
    );

    let mut agent = registry.create(name)?;
    agent.init_ai(&game, player)?;
    let agent: Arc<Mutex<Box<dyn Agent>>> = Arc::new(Mutex::new(agent));

    let chosen = select_with_watchdog(
        agent.clone(),
        Arc::new(game),
        Arc::new(state),
        budget,
        grace,
    )
    .await;

    if let Err(BridgeError::DeadlineExceeded(deadline)) = &chosen {
        // The abandoned call still holds the agent; closing would block on it
        bail!("{} did not answer within {:?}", name, deadline);
    }

    let close = agent
        .lock()
        .map_err(|_| anyhow!("agent lock poisoned"))?
        .close_ai();
    let chosen = chosen?;
    if let Err(e) = close {
        warn!("Closing {} failed: {}", name, e);
    }

    Ok(Decision {
        agent: name.to_owned(),
        player,
        chosen,
        state_hash,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = BridgeConfig::default();
    args.apply(&mut config);
    info!(
        "Kriegspiel agent host starting (library: {}, search path: {})",
        config.library_name,
        config.describe_search_path()
    );

    let mut registry = AgentRegistry::new();
    register_native_agent(&mut registry, &config);

    let kriegspiel = GameDescriptor::kriegspiel();
    let available = registry.agents_for(&kriegspiel);
    if available.is_empty() {
        warn!("No registered agent can play {}", kriegspiel.name);
    }
    for name in &available {
        info!("Available for {}: {}", kriegspiel.name, name);
    }

    let Some(path) = args.position else {
        return Ok(());
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read position file {}", path.display()))?;
    let position: PositionFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse position file {}", path.display()))?;

    match play(
        &registry,
        &config.display_name,
        position,
        config.watchdog_grace,
    )
    .await
    {
        Ok(decision) => {
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(())
        }
        Err(e) => {
            error!("Decision failed: {:#}", e);
            // An abandoned native call would keep the runtime alive on shutdown
            std::process::exit(1);
        }
    }
}
