//! Headless runner for the overworld simulation.
//!
//! Usage:
//!   overworld run --levels assets/levels --level overworld --input walk.txt --ticks 600
//!   overworld check-level --levels assets/levels --level dungeon_1
//!   overworld new-save --out saves/slot1.json
//!
//! `run` replays an input script against a level and prints a JSON summary
//! of the final state to stdout. Logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec2;
use overworld_core::backend::NullAudio;
use overworld_core::events::EventRecord;
use overworld_core::input::{InputKeys, InputProvider, ScriptedInput};
use overworld_core::map::{CsvMapLoader, LevelLayouts};
use overworld_core::persistence::{JsonFileStore, Persistence, WorldState};
use overworld_core::player::Player;
use overworld_core::{Session, SessionSummary, Settings};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "overworld")]
#[command(about = "Headless runner for the overworld simulation")]
struct Cli {
    /// Log filter, e.g. `info` or `overworld_core=debug`
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an input script against a level
    Run {
        /// Directory holding one folder of layer CSVs per level
        #[arg(long)]
        levels: PathBuf,
        /// Level to start in
        #[arg(long)]
        level: String,
        /// Settings JSON; defaults apply when omitted
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Input script, one `<ticks> <key>[+<key>]` segment per line
        #[arg(long)]
        input: Option<PathBuf>,
        /// Ticks to run; defaults to the script length
        #[arg(long)]
        ticks: Option<u64>,
        /// Random seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Save file to load before running
        #[arg(long)]
        load: Option<PathBuf>,
        /// Save file to write after running
        #[arg(long)]
        save: Option<PathBuf>,
        /// Include the full event log in the output
        #[arg(long)]
        events: bool,
    },
    /// Build a level and report what it contains
    CheckLevel {
        /// Directory holding one folder of layer CSVs per level
        #[arg(long)]
        levels: PathBuf,
        /// Level to check
        #[arg(long)]
        level: String,
        /// Settings JSON; defaults apply when omitted
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Write a fresh save file for a new game
    NewSave {
        /// Where to write the save
        #[arg(long)]
        out: PathBuf,
        /// Level the new game starts in
        #[arg(long, default_value = "overworld")]
        level: String,
        /// Settings JSON; defaults apply when omitted
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct RunReport {
    summary: SessionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<EventRecord>>,
}

#[derive(Serialize)]
struct LevelReport {
    level: String,
    obstacles: usize,
    monsters: usize,
    pickups: usize,
    npcs: usize,
    triggers: usize,
    player_start: [f32; 2],
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Run {
            levels,
            level,
            settings,
            input,
            ticks,
            seed,
            load,
            save,
            events,
        } => run(&RunArgs {
            levels,
            level,
            settings,
            input,
            ticks,
            seed,
            load,
            save,
            events,
        }),
        Commands::CheckLevel {
            levels,
            level,
            settings,
        } => check_level(&levels, &level, settings.as_deref()),
        Commands::NewSave {
            out,
            level,
            settings,
        } => new_save(&out, &level, settings.as_deref()),
    }
}

/// Logs to stderr so stdout stays machine-readable.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn load_layouts(levels: &Path, level: &str) -> Result<LevelLayouts> {
    let loader = CsvMapLoader::new(levels);
    LevelLayouts::load(&loader, level)
        .with_context(|| format!("Failed to load level {level} from {}", levels.display()))
}

struct RunArgs {
    levels: PathBuf,
    level: String,
    settings: Option<PathBuf>,
    input: Option<PathBuf>,
    ticks: Option<u64>,
    seed: u64,
    load: Option<PathBuf>,
    save: Option<PathBuf>,
    events: bool,
}

/// Input source that holds nothing, for runs without a script.
struct Idle;

impl InputProvider for Idle {
    fn poll(&mut self) -> InputKeys {
        InputKeys::empty()
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    let layouts = load_layouts(&args.levels, &args.level)?;
    let mut session = Session::new(settings, layouts, args.seed).context("Failed to start session")?;

    if let Some(path) = &args.load {
        session
            .load(&mut JsonFileStore::new(path))
            .with_context(|| format!("Failed to load save {}", path.display()))?;
    }

    let (mut input, script_ticks): (Box<dyn InputProvider>, u64) = match &args.input {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read input script {}", path.display()))?;
            let script = ScriptedInput::parse(&text)
                .with_context(|| format!("Invalid input script {}", path.display()))?;
            let total = script.total_ticks();
            (Box::new(script), total)
        }
        None => (Box::new(Idle), 0),
    };
    let ticks = args.ticks.unwrap_or(script_ticks);

    info!(level = %args.level, ticks, seed = args.seed, "running");
    session.run(input.as_mut(), &mut NullAudio, ticks);

    if let Some(path) = &args.save {
        session
            .save(&mut JsonFileStore::new(path))
            .with_context(|| format!("Failed to write save {}", path.display()))?;
    }

    let report = RunReport {
        summary: session.summary(),
        events: args.events.then(|| session.take_events()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn check_level(levels: &Path, level: &str, settings: Option<&Path>) -> Result<()> {
    let settings = load_settings(settings)?;
    let layouts = load_layouts(levels, level)?;
    let session = Session::new(settings, layouts, 0).with_context(|| format!("Level {level} is invalid"))?;
    let built = session.level();

    let report = LevelReport {
        level: built.id.clone(),
        obstacles: built.obstacles.len(),
        monsters: built.monsters.len(),
        pickups: built.pickups.len(),
        npcs: built.npcs.len(),
        triggers: built.triggers.len(),
        player_start: built.player_start.to_array(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn new_save(out: &Path, level: &str, settings: Option<&Path>) -> Result<()> {
    let settings = load_settings(settings)?;
    let player = Player::new(Vec2::ZERO, &settings, 0);
    JsonFileStore::new(out)
        .save(&player.snapshot(level), &WorldState::default())
        .with_context(|| format!("Failed to write save {}", out.display()))?;
    info!(path = %out.display(), level, "new save written");
    Ok(())
}
