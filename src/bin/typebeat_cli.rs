use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use typebeat_engine::{init_logging, persistence, EngineConfig, PatternEngine};

#[derive(Parser, Debug)]
#[command(
    name = "typebeat_cli",
    about = "Deterministic replay harness for the typebeat pattern engine"
)]
struct Cli {
    /// Engine configuration file (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for the suggestion RNG, making replays reproducible
    #[arg(long)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a keystroke fixture and print the final analysis snapshot
    Replay {
        /// JSON array of {character, timestamp_ms, beat_position?} events
        input: PathBuf,
        /// Restore a saved engine snapshot before replaying
        #[arg(long)]
        state: Option<PathBuf>,
        /// Save the engine snapshot here after replaying
        #[arg(long)]
        save_state: Option<PathBuf>,
        /// Write the analysis snapshot to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Type a literal string at a fixed interval and print the snapshot
    Type {
        text: String,
        /// Milliseconds between synthesized keystrokes
        #[arg(long, default_value_t = 600)]
        interval_ms: u64,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the effective engine configuration as JSON
    DumpConfig,
}

#[derive(Deserialize, Debug)]
struct ReplayEvent {
    character: char,
    timestamp_ms: u64,
    #[serde(default)]
    beat_position: Option<f32>,
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_ref()
        .map(EngineConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Replay {
            input,
            state,
            save_state,
            output,
        } => run_replay(config, cli.seed, &input, state, save_state, output),
        Commands::Type {
            text,
            interval_ms,
            output,
        } => run_type(config, cli.seed, &text, interval_ms, output),
        Commands::DumpConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

fn build_engine(config: EngineConfig, seed: Option<u64>) -> PatternEngine {
    match seed {
        Some(seed) => PatternEngine::with_seed(config, seed),
        None => PatternEngine::new(config),
    }
}

fn run_replay(
    config: EngineConfig,
    seed: Option<u64>,
    input: &PathBuf,
    state: Option<PathBuf>,
    save_state: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let contents =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let events: Vec<ReplayEvent> =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", input.display()))?;

    let mut engine = build_engine(config, seed);
    if let Some(path) = state {
        engine.load_state(persistence::load_from_file(&path));
    }

    let mut last_ts = 0;
    for event in &events {
        engine.record_keystroke(event.character, event.timestamp_ms, event.beat_position);
        last_ts = event.timestamp_ms;
    }

    emit_snapshot(&engine, output)?;

    if let Some(path) = save_state {
        persistence::save_to_file(&path, &engine.export_state(last_ts))
            .with_context(|| format!("saving state to {}", path.display()))?;
    }
    Ok(ExitCode::from(0))
}

fn run_type(
    config: EngineConfig,
    seed: Option<u64>,
    text: &str,
    interval_ms: u64,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let mut engine = build_engine(config, seed);
    let mut ts = 0;
    for ch in text.chars().flat_map(|c| c.to_lowercase()) {
        engine.record_keystroke(ch, ts, None);
        ts += interval_ms;
    }
    emit_snapshot(&engine, output)?;
    Ok(ExitCode::from(0))
}

fn emit_snapshot(engine: &PatternEngine, output: Option<PathBuf>) -> Result<()> {
    let snapshot = engine.current_analysis();
    let json = serde_json::to_string_pretty(&snapshot)?;
    if let Some(path) = output {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(())
}
