//! Runs one autoplayed session to completion.

use arena_core::error::Result;
use arena_core::replay::{Replay, ReplayRecorder};
use arena_core::session::{Session, SessionPhase};
use arena_core::tuning::Tuning;
use serde::{Deserialize, Serialize};

use crate::metrics::{GameMetrics, MetricsCollector};
use crate::pilot::{Pilot, PilotKind};

/// Default tick budget: ten minutes at 60 ticks per second.
pub const DEFAULT_MAX_TICKS: u64 = 36_000;

/// Configuration for one autoplayed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Session seed.
    pub seed: u64,
    /// First level.
    pub start_level: u32,
    /// Stop after this many ticks even if the session is still going.
    pub max_ticks: u64,
    /// Who drives the player.
    pub pilot: PilotKind,
    /// Gameplay constants.
    pub tuning: Tuning,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            start_level: 1,
            max_ticks: DEFAULT_MAX_TICKS,
            pilot: PilotKind::default(),
            tuning: Tuning::default(),
        }
    }
}

impl GameConfig {
    /// Default config for a seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }
}

/// Play a session until game over or the tick budget runs out.
pub fn run_game(config: &GameConfig) -> Result<GameMetrics> {
    let mut session = Session::new(config.seed, config.start_level, config.tuning.clone())?;
    let mut pilot = Pilot::new(config.pilot);
    let mut collector = MetricsCollector::new(config.seed, config.start_level);

    for _ in 0..config.max_ticks {
        if is_over(&session) {
            break;
        }
        let input = pilot.next_input(session.simulation());
        let report = session.tick(input)?;
        collector.observe(&report);
    }

    let metrics = collector.finish(&session);
    tracing::debug!(
        seed = config.seed,
        score = metrics.score,
        levels = metrics.levels_cleared,
        ticks = metrics.duration_ticks,
        "Game finished"
    );
    Ok(metrics)
}

/// Like [`run_game`], but also records a replay of the session.
pub fn run_recorded_game(config: &GameConfig) -> Result<(GameMetrics, Replay)> {
    let mut recorder = ReplayRecorder::start(config.seed, config.start_level, config.tuning.clone())?;
    let mut pilot = Pilot::new(config.pilot);
    let mut collector = MetricsCollector::new(config.seed, config.start_level);

    for _ in 0..config.max_ticks {
        if is_over(recorder.session()) {
            break;
        }
        let input = pilot.next_input(recorder.session().simulation());
        let report = recorder.tick(input)?;
        collector.observe(&report);
    }

    let metrics = collector.finish(recorder.session());
    Ok((metrics, recorder.finish()))
}

fn is_over(session: &Session) -> bool {
    matches!(session.phase(), SessionPhase::GameOver { .. })
}
