//! Batch session runner for balance testing.
//!
//! Runs many autoplayed sessions in parallel using rayon, one per seed,
//! and aggregates their metrics.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use arena_core::tuning::Tuning;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, RunnerError};
use crate::game_runner::{run_game, GameConfig, DEFAULT_MAX_TICKS};
use crate::metrics::{BatchSummary, GameMetrics};
use crate::pilot::PilotKind;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of sessions to run.
    pub game_count: u32,
    /// Maximum parallel sessions (0 = use rayon default).
    pub parallel_games: u32,
    /// Seed of the first session; the rest count up from it.
    pub seed_start: u64,
    /// First level of every session.
    pub start_level: u32,
    /// Tick budget per session.
    pub max_ticks: u64,
    /// Who drives the player.
    pub pilot: PilotKind,
    /// Gameplay constants shared by every session.
    pub tuning: Tuning,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            start_level: 1,
            max_ticks: DEFAULT_MAX_TICKS,
            pilot: PilotKind::default(),
            tuning: Tuning::default(),
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` sessions with defaults elsewhere.
    #[must_use]
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Load a batch config written in RON.
    pub fn load_ron(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RunnerError::io(path, e))?;
        ron::from_str(&text).map_err(|e| RunnerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn game(&self, index: u32) -> GameConfig {
        GameConfig {
            seed: self.seed_start.wrapping_add(u64::from(index)),
            start_level: self.start_level,
            max_ticks: self.max_ticks,
            pilot: self.pilot,
            tuning: self.tuning.clone(),
        }
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual session metrics, in seed order.
    pub games: Vec<GameMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Errors encountered.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RunnerError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| RunnerError::io(path, e))
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| RunnerError::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Default file name inside an output directory.
    #[must_use]
    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join("batch.json")
    }
}

/// A session that failed to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Session index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Run every session of a batch.
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        games = config.game_count,
        seed_start = config.seed_start,
        pilot = ?config.pilot,
        "Starting batch run"
    );

    let results: Vec<std::result::Result<GameMetrics, BatchError>> = {
        let play = |i: u32| {
            let game = config.game(i);
            let outcome = run_game(&game).map_err(|e| BatchError {
                game_index: i,
                seed: game.seed,
                message: e.to_string(),
            });
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % 10 == 0 {
                debug!("Progress: {}/{}", done, config.game_count);
            }
            outcome
        };

        if config.parallel_games > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.parallel_games as usize)
                .build()
            {
                Ok(pool) => {
                    pool.install(|| (0..config.game_count).into_par_iter().map(play).collect())
                }
                Err(e) => {
                    warn!("Failed to build thread pool ({e}), using the global one");
                    (0..config.game_count).into_par_iter().map(play).collect()
                }
            }
        } else {
            (0..config.game_count).into_par_iter().map(play).collect()
        }
    };

    let mut games = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(metrics) => games.push(metrics),
            Err(e) => {
                warn!(seed = e.seed, "Game {} failed: {}", e.game_index, e.message);
                errors.push(e);
            }
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        games = games.len(),
        errors = errors.len(),
        seconds = duration_seconds,
        "Batch complete"
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(count: u32, seed: u64) -> BatchConfig {
        BatchConfig {
            max_ticks: 600,
            ..BatchConfig::new(count).with_seed(seed)
        }
    }

    #[test]
    fn test_batch_runs_every_seed_in_order() {
        let results = run_batch(small(4, 100));
        assert!(results.errors.is_empty());
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![100, 101, 102, 103]);
        assert_eq!(results.summary.total_games, 4);
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let config = small(3, 7);
        let results = run_batch(config.clone());
        for (i, game) in results.games.iter().enumerate() {
            let solo = run_game(&config.game(i as u32)).unwrap();
            assert_eq!(&solo, game);
        }
    }

    #[test]
    fn test_bounded_pool() {
        let results = run_batch(BatchConfig {
            parallel_games: 2,
            ..small(2, 9)
        });
        assert_eq!(results.games.len(), 2);
    }

    #[test]
    fn test_failed_sessions_are_collected() {
        let results = run_batch(BatchConfig {
            start_level: 0,
            ..small(2, 0)
        });
        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 2);
        assert_eq!(results.summary, BatchSummary::default());
    }

    #[test]
    fn test_save_load_results() {
        let results = run_batch(small(2, 11));
        let dir = tempfile::tempdir().unwrap();
        let path = BatchResults::default_path(&dir.path().join("out"));
        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.config, results.config);
    }

    #[test]
    fn test_bad_ron_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "(game_count: ").unwrap();
        assert!(matches!(
            BatchConfig::load_ron(&path),
            Err(RunnerError::Config { .. })
        ));
    }

    #[test]
    fn test_config_from_ron() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.ron");
        let config = small(5, 3);
        std::fs::write(&path, ron::to_string(&config).unwrap()).unwrap();
        assert_eq!(BatchConfig::load_ron(&path).unwrap(), config);
    }
}
