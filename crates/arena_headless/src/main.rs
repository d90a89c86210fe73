//! Headless arena runner.
//!
//! Runs the simulation without graphics for map inspection, autoplay
//! batches, determinism checks and replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Dump a generated level
//! cargo run -p arena_headless -- generate --seed 42 --level 1
//!
//! # Autoplay one session and record it
//! cargo run -p arena_headless -- run --seed 7 --record run.replay
//!
//! # Run batch balance sweep
//! cargo run -p arena_headless -- batch --count 500 --output results/
//!
//! # Check a replay still matches the current simulation
//! cargo run -p arena_headless -- replay --input run.replay --verify
//! ```
//!
//! Machine-readable output goes to stdout; logs go to stderr.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_core::replay::{Replay, ReplayPlayer};
use arena_core::simulation::{LevelSetup, Simulation};
use arena_core::tuning::Tuning;
use arena_headless::{
    ascii_visualizer::{render_ascii, AsciiConfig},
    batch::{run_batch, BatchConfig, BatchResults},
    game_runner::{run_game, run_recorded_game, GameConfig, DEFAULT_MAX_TICKS},
    pilot::PilotKind,
};

#[derive(Parser)]
#[command(name = "arena_headless")]
#[command(about = "Headless tank arena runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a level and print it as ASCII
    Generate {
        /// Session seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Level number (1-based)
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// Print generator stats as JSON instead of the grid
        #[arg(long)]
        json: bool,
    },

    /// Autoplay a single session
    Run {
        /// Session seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// First level
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// Tick budget
        #[arg(short, long, default_value_t = DEFAULT_MAX_TICKS)]
        ticks: u64,

        /// Player policy (idle, patrol, hunter)
        #[arg(short, long, default_value = "hunter")]
        pilot: PilotKind,

        /// Tuning file (RON) overriding the defaults
        #[arg(long)]
        tuning: Option<PathBuf>,

        /// Write a replay of the session here
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a batch of sessions for balance testing
    Batch {
        /// Number of sessions to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel sessions (0 = auto)
        #[arg(long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting session seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// First level of every session
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// Tick budget per session
        #[arg(short, long, default_value_t = DEFAULT_MAX_TICKS)]
        ticks: u64,

        /// Player policy (idle, patrol, hunter)
        #[arg(short, long, default_value = "hunter")]
        pilot: PilotKind,

        /// Tuning file (RON) overriding the defaults
        #[arg(long)]
        tuning: Option<PathBuf>,

        /// Batch config file (RON); replaces every other batch flag
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run the same session several times in parallel and compare hashes
    Verify {
        /// Session seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// First level
        #[arg(short, long, default_value = "1")]
        level: u32,

        /// Tick budget per run
        #[arg(short, long, default_value = "3600")]
        ticks: u64,

        /// Number of runs
        #[arg(short, long, default_value = "4")]
        runs: u32,

        /// Player policy (idle, patrol, hunter)
        #[arg(short, long, default_value = "hunter")]
        pilot: PilotKind,
    },

    /// Inspect or verify a recorded replay
    Replay {
        /// Replay file
        #[arg(short, long)]
        input: PathBuf,

        /// Re-simulate and compare every checkpoint
        #[arg(long)]
        verify: bool,
    },

    /// Print the default tuning as RON
    Tuning {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for results)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Generate { seed, level, json }) => cmd_generate(seed, level, json),
        Some(Commands::Run {
            seed,
            level,
            ticks,
            pilot,
            tuning,
            record,
        }) => {
            let config = GameConfig {
                seed,
                start_level: level,
                max_ticks: ticks,
                pilot,
                tuning: load_tuning(tuning.as_deref()),
            };
            cmd_run(&config, record);
        }
        Some(Commands::Batch {
            count,
            parallel,
            output,
            seed,
            level,
            ticks,
            pilot,
            tuning,
            config,
        }) => {
            let config = match config {
                Some(path) => match BatchConfig::load_ron(&path) {
                    Ok(config) => config,
                    Err(e) => fail(&format!("Failed to load batch config: {e}")),
                },
                None => BatchConfig {
                    game_count: count,
                    parallel_games: parallel,
                    seed_start: seed,
                    start_level: level,
                    max_ticks: ticks,
                    pilot,
                    tuning: load_tuning(tuning.as_deref()),
                },
            };
            cmd_batch(config, &output);
        }
        Some(Commands::Verify {
            seed,
            level,
            ticks,
            runs,
            pilot,
        }) => cmd_verify(seed, level, ticks, runs, pilot),
        Some(Commands::Replay { input, verify }) => cmd_replay(&input, verify),
        Some(Commands::Tuning { output }) => cmd_tuning(output),
        None => cmd_generate(42, 1, false),
    }
}

fn fail(message: &str) -> ! {
    tracing::error!("{message}");
    std::process::exit(1);
}

fn load_tuning(path: Option<&Path>) -> Tuning {
    match path {
        None => Tuning::default(),
        Some(path) => match Tuning::load(path) {
            Ok(tuning) => {
                tracing::info!("Loaded tuning from {}", path.display());
                tuning
            }
            Err(e) => fail(&format!("Failed to load tuning: {e}")),
        },
    }
}

fn cmd_generate(seed: u64, level: u32, json: bool) {
    let sim = match Simulation::new(LevelSetup::new(level, seed), Tuning::default()) {
        Ok(sim) => sim,
        Err(e) => fail(&format!("Failed to build level: {e}")),
    };

    if json {
        let Some(stats) = sim.map().generation_stats() else {
            fail("Level map has no generator stats");
        };
        match serde_json::to_string_pretty(stats) {
            Ok(text) => println!("{text}"),
            Err(e) => fail(&format!("Failed to encode stats: {e}")),
        }
        return;
    }

    print!("{}", render_ascii(sim.map(), &sim.snapshot(), &AsciiConfig::default()));
    if let Some(stats) = sim.map().generation_stats() {
        eprintln!(
            "structures: {}  mirrored: {}  repair passes: {}  fallback fills: {}  empty: {:.1}%",
            stats.structures,
            stats.symmetric_pattern,
            stats.repair_passes,
            stats.fallback_fills,
            stats.empty_fraction * 100.0
        );
    }
}

fn cmd_run(config: &GameConfig, record: Option<PathBuf>) {
    tracing::info!(
        seed = config.seed,
        level = config.start_level,
        pilot = ?config.pilot,
        "Starting autoplay session"
    );

    let metrics = match record {
        None => match run_game(config) {
            Ok(metrics) => metrics,
            Err(e) => fail(&format!("Session failed: {e}")),
        },
        Some(path) => {
            let (metrics, replay) = match run_recorded_game(config) {
                Ok(done) => done,
                Err(e) => fail(&format!("Session failed: {e}")),
            };
            if let Err(e) = replay.save(&path) {
                fail(&format!("Failed to save replay: {e}"));
            }
            tracing::info!("Replay saved to {}", path.display());
            metrics
        }
    };

    eprintln!("\n╔════════════════════════════════════╗");
    eprintln!("║           SESSION FINISHED          ║");
    eprintln!("╠════════════════════════════════════╣");
    eprintln!("║ Outcome: {:>25} ║", format!("{:?}", metrics.outcome));
    eprintln!("║ Score: {:>27} ║", metrics.score);
    eprintln!("║ Levels cleared: {:>18} ║", metrics.levels_cleared);
    eprintln!("║ Kills: {:>27} ║", metrics.total_kills());
    eprintln!("║ Ticks: {:>27} ║", metrics.duration_ticks);
    eprintln!("╚════════════════════════════════════╝");

    match serde_json::to_string_pretty(&metrics) {
        Ok(json) => println!("{json}"),
        Err(e) => fail(&format!("Failed to encode metrics: {e}")),
    }
}

fn cmd_batch(config: BatchConfig, output: &Path) {
    let results = run_batch(config);
    let path = BatchResults::default_path(output);
    if let Err(e) = results.save(&path) {
        fail(&format!("Failed to save results: {e}"));
    }

    let summary = &results.summary;
    eprintln!("\n╔════════════════════════════════════╗");
    eprintln!("║           BATCH COMPLETE            ║");
    eprintln!("╠════════════════════════════════════╣");
    eprintln!("║ Sessions: {:>24} ║", summary.total_games);
    eprintln!("║ Game overs: {:>21.1}% ║", summary.game_over_rate() * 100.0);
    eprintln!("║ Avg score: {:>23.0} ║", summary.avg_score);
    eprintln!("║ Avg levels cleared: {:>14.2} ║", summary.avg_levels_cleared);
    eprintln!("║ Errors: {:>26} ║", results.errors.len());
    eprintln!("╚════════════════════════════════════╝");
    eprintln!("Results saved to {}", path.display());

    if !results.errors.is_empty() {
        std::process::exit(1);
    }
}

fn cmd_verify(seed: u64, level: u32, ticks: u64, runs: u32, pilot: PilotKind) {
    let config = GameConfig {
        seed,
        start_level: level,
        max_ticks: ticks,
        pilot,
        tuning: Tuning::default(),
    };
    tracing::info!(seed, level, ticks, runs, "Verifying determinism");

    let hashes: Vec<u64> = match (0..runs)
        .into_par_iter()
        .map(|_| run_game(&config).map(|m| m.final_state_hash))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(hashes) => hashes,
        Err(e) => fail(&format!("Session failed: {e}")),
    };

    if hashes.windows(2).all(|w| w[0] == w[1]) {
        println!("✓ {runs} runs agree on hash {:016x}", hashes.first().copied().unwrap_or(0));
    } else {
        eprintln!("✗ Runs diverged: {hashes:016x?}");
        std::process::exit(1);
    }
}

fn cmd_replay(input: &Path, verify: bool) {
    let replay = match Replay::load(input) {
        Ok(replay) => replay,
        Err(e) => fail(&format!("Failed to load replay: {e}")),
    };
    eprintln!(
        "Replay: seed {} from level {}, {} ticks, {} checkpoints",
        replay.session_seed,
        replay.start_level,
        replay.duration(),
        replay.checkpoints.len()
    );
    if !verify {
        return;
    }

    let mut player = match ReplayPlayer::new(replay) {
        Ok(player) => player,
        Err(e) => fail(&format!("Failed to start replay: {e}")),
    };
    match player.verify() {
        Ok(()) => println!("✓ Replay verified ({} ticks)", player.current_tick()),
        Err(e) => {
            eprintln!("✗ {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_tuning(output: Option<PathBuf>) {
    let text = match Tuning::default().to_ron_string() {
        Ok(text) => text,
        Err(e) => fail(&format!("Failed to encode tuning: {e}")),
    };
    match output {
        None => println!("{text}"),
        Some(path) => {
            if let Err(e) = std::fs::write(&path, text) {
                fail(&format!("Failed to write {}: {e}", path.display()));
            }
            tracing::info!("Tuning written to {}", path.display());
        }
    }
}
