//! Per-session metrics and batch summaries.
//!
//! A [`MetricsCollector`] watches the event stream of every tick; the
//! finished [`GameMetrics`] are what batch runs serialize and aggregate.

use std::collections::BTreeMap;

use arena_core::events::{GameEvent, TickReport};
use arena_core::session::{Session, SessionPhase};
use serde::{Deserialize, Serialize};

/// How an autoplayed session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    /// A level was lost.
    GameOver,
    /// The tick budget ran out first.
    #[default]
    Timeout,
}

/// Complete metrics for a single session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Session seed.
    pub seed: u64,
    /// Level the session started on.
    pub start_level: u32,
    /// Level the session ended on.
    pub final_level: u32,
    /// Levels won.
    pub levels_cleared: u32,
    /// How it ended.
    pub outcome: Outcome,
    /// Final score.
    pub score: u64,
    /// Enemy kills by type name.
    pub kills: BTreeMap<String, u32>,
    /// Player deaths.
    pub deaths: u32,
    /// Power-ups taken by the player.
    pub power_ups_collected: u32,
    /// Power-ups taken by enemies.
    pub power_ups_stolen: u32,
    /// UFOs shot down.
    pub ufos_destroyed: u32,
    /// Ticks played.
    pub duration_ticks: u64,
    /// Final session hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Total enemy kills.
    #[must_use]
    pub fn total_kills(&self) -> u32 {
        self.kills.values().sum()
    }
}

/// Folds tick reports into [`GameMetrics`].
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: GameMetrics,
}

impl MetricsCollector {
    /// Start collecting for a session.
    #[must_use]
    pub fn new(seed: u64, start_level: u32) -> Self {
        Self {
            metrics: GameMetrics {
                seed,
                start_level,
                final_level: start_level,
                ..Default::default()
            },
        }
    }

    /// Record one tick's events.
    pub fn observe(&mut self, report: &TickReport) {
        for event in &report.events {
            match event {
                GameEvent::EnemyKilled { kind, .. } => {
                    *self.metrics.kills.entry(format!("{kind:?}")).or_default() += 1;
                }
                GameEvent::PlayerDied { .. } => self.metrics.deaths += 1,
                GameEvent::PowerUpCollected { by_player, .. } => {
                    if *by_player {
                        self.metrics.power_ups_collected += 1;
                    } else {
                        self.metrics.power_ups_stolen += 1;
                    }
                }
                GameEvent::UfoDestroyed { .. } => self.metrics.ufos_destroyed += 1,
                _ => {}
            }
        }
    }

    /// Close the books on a session.
    #[must_use]
    pub fn finish(mut self, session: &Session) -> GameMetrics {
        let sim = session.simulation();
        self.metrics.final_level = session.level();
        self.metrics.levels_cleared = session.levels_cleared();
        self.metrics.duration_ticks = session.total_ticks();
        self.metrics.final_state_hash = session.state_hash();
        match session.phase() {
            SessionPhase::GameOver { score, .. } => {
                self.metrics.outcome = Outcome::GameOver;
                self.metrics.score = score;
            }
            SessionPhase::Playing => {
                self.metrics.outcome = Outcome::Timeout;
                self.metrics.score = sim.score();
            }
        }
        self.metrics
    }
}

/// Aggregate over many sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Sessions played.
    pub total_games: u32,
    /// Sessions that ended in a loss.
    pub game_overs: u32,
    /// Sessions still alive when the tick budget ran out.
    pub timeouts: u32,
    /// Mean final score.
    pub avg_score: f64,
    /// Best final score.
    pub max_score: u64,
    /// Mean levels won per session.
    pub avg_levels_cleared: f64,
    /// Most levels won by one session.
    pub max_levels_cleared: u32,
    /// Mean kills per session by enemy type.
    pub avg_kills: BTreeMap<String, f64>,
    /// Mean player deaths per session.
    pub avg_deaths: f64,
    /// Mean session length in ticks.
    pub avg_duration_ticks: f64,
}

impl BatchSummary {
    /// Calculate summary from a list of game metrics.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let n = games.len() as f64;

        let mut summary = Self {
            total_games: games.len() as u32,
            ..Default::default()
        };

        let mut score_sum = 0u64;
        let mut cleared_sum = 0u64;
        let mut deaths_sum = 0u64;
        let mut duration_sum = 0u64;
        let mut kill_sums: BTreeMap<String, u64> = BTreeMap::new();

        for game in games {
            match game.outcome {
                Outcome::GameOver => summary.game_overs += 1,
                Outcome::Timeout => summary.timeouts += 1,
            }
            score_sum += game.score;
            summary.max_score = summary.max_score.max(game.score);
            cleared_sum += u64::from(game.levels_cleared);
            summary.max_levels_cleared = summary.max_levels_cleared.max(game.levels_cleared);
            deaths_sum += u64::from(game.deaths);
            duration_sum += game.duration_ticks;
            for (kind, count) in &game.kills {
                *kill_sums.entry(kind.clone()).or_default() += u64::from(*count);
            }
        }

        summary.avg_score = score_sum as f64 / n;
        summary.avg_levels_cleared = cleared_sum as f64 / n;
        summary.avg_deaths = deaths_sum as f64 / n;
        summary.avg_duration_ticks = duration_sum as f64 / n;
        summary.avg_kills = kill_sums
            .into_iter()
            .map(|(kind, sum)| (kind, sum as f64 / n))
            .collect();
        summary
    }

    /// Share of sessions that ended in a loss.
    #[must_use]
    pub fn game_over_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            f64::from(self.game_overs) / f64::from(self.total_games)
        }
    }
}
