//! Multi-level session.
//!
//! A [`Session`] chains levels: clearing one builds the next from the same
//! session seed, carrying the player's lives, score and upgrades forward.
//! Losing any level ends the session.

use serde::{Deserialize, Serialize};

use crate::entities::Tank;
use crate::error::Result;
use crate::events::{LevelStatus, TickReport};
use crate::math::{fixed_serde, Fixed};
use crate::simulation::{LevelSetup, PlayerInput, Simulation};
use crate::tuning::{PlayerStats, Tuning};

/// Player state that survives a level transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryOver {
    /// Lives left.
    pub lives: u32,
    /// Session score.
    pub score: u64,
    /// Star pickups held.
    pub star_stacks: u8,
    /// Machinegun pickups held.
    pub machinegun_stacks: u8,
    /// Shell power.
    pub bullet_power: u8,
    /// Ship pickup.
    pub can_swim: bool,
    /// Saw pickup.
    pub can_cut_forest: bool,
    /// Car pickups.
    #[serde(with = "fixed_serde")]
    pub speed_multiplier: Fixed,
}

impl CarryOver {
    /// Starting state of a new session.
    #[must_use]
    pub fn fresh(stats: &PlayerStats) -> Self {
        Self {
            lives: stats.lives,
            score: 0,
            star_stacks: 0,
            machinegun_stacks: 0,
            bullet_power: stats.bullet_power,
            can_swim: false,
            can_cut_forest: false,
            speed_multiplier: Fixed::ONE,
        }
    }

    /// Capture a player tank at the end of a level.
    #[must_use]
    pub fn from_tank(tank: &Tank, score: u64) -> Self {
        Self {
            lives: tank.lives,
            score,
            star_stacks: tank.star_stacks,
            machinegun_stacks: tank.machinegun_stacks,
            bullet_power: tank.bullet_power,
            can_swim: tank.can_swim,
            can_cut_forest: tank.can_cut_forest,
            speed_multiplier: tank.speed_multiplier,
        }
    }

    /// Restore the carried state onto a fresh player tank.
    pub fn apply_to(&self, tank: &mut Tank) {
        tank.lives = self.lives;
        tank.star_stacks = self.star_stacks;
        tank.machinegun_stacks = self.machinegun_stacks;
        tank.bullet_power = self.bullet_power;
        tank.can_swim = self.can_swim;
        tank.can_cut_forest = self.can_cut_forest;
        tank.speed_multiplier = self.speed_multiplier;
    }
}

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// A level is in play.
    Playing,
    /// A level was lost.
    GameOver {
        /// Level it ended on.
        level: u32,
        /// Final score.
        score: u64,
    },
}

/// A run of consecutive levels from one seed.
#[derive(Debug)]
pub struct Session {
    session_seed: u64,
    start_level: u32,
    tuning: Tuning,
    sim: Simulation,
    phase: SessionPhase,
    levels_cleared: u32,
    total_ticks: u64,
}

impl Session {
    /// Start a session at `start_level`.
    pub fn new(session_seed: u64, start_level: u32, tuning: Tuning) -> Result<Self> {
        let sim = Simulation::new(LevelSetup::new(start_level, session_seed), tuning.clone())?;
        tracing::info!(session_seed, start_level, "Session started");
        Ok(Self {
            session_seed,
            start_level,
            tuning,
            sim,
            phase: SessionPhase::Playing,
            levels_cleared: 0,
            total_ticks: 0,
        })
    }

    /// Root seed.
    #[must_use]
    pub const fn session_seed(&self) -> u64 {
        self.session_seed
    }

    /// Level the session began on.
    #[must_use]
    pub const fn start_level(&self) -> u32 {
        self.start_level
    }

    /// Current level number.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.sim.level()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Levels won so far.
    #[must_use]
    pub const fn levels_cleared(&self) -> u32 {
        self.levels_cleared
    }

    /// Ticks run across all levels.
    #[must_use]
    pub const fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Current level simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Mutable access to the current level, for tools and tests.
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// Advance one tick, moving to the next level on a win.
    ///
    /// The report is the one of the tick just run; the first tick of a new
    /// level happens on the following call.
    pub fn tick(&mut self, input: PlayerInput) -> Result<TickReport> {
        if let SessionPhase::GameOver { .. } = self.phase {
            return Ok(self.sim.tick(input));
        }
        self.total_ticks += 1;
        let report = self.sim.tick(input);
        match report.status {
            LevelStatus::Playing => {}
            LevelStatus::Won => self.advance()?,
            LevelStatus::Lost(reason) => {
                let (level, score) = (self.sim.level(), self.sim.score());
                tracing::info!(level, score, ?reason, "Session over");
                self.phase = SessionPhase::GameOver { level, score };
            }
        }
        Ok(report)
    }

    fn advance(&mut self) -> Result<()> {
        let carry = self.sim.carry_over();
        let next = self.sim.level() + 1;
        let setup = LevelSetup::new(next, self.session_seed).with_carry(carry);
        self.sim = Simulation::new(setup, self.tuning.clone())?;
        self.levels_cleared += 1;
        Ok(())
    }

    /// Throw the session away and start again from the first level.
    pub fn restart(&mut self) -> Result<()> {
        *self = Self::new(self.session_seed, self.start_level, self.tuning.clone())?;
        Ok(())
    }

    /// Hash of the session state; equal for equal seeds and inputs.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = crate::hashing::StableHasher::new();
        self.levels_cleared.hash(&mut hasher);
        self.total_ticks.hash(&mut hasher);
        self.sim.state_hash().hash(&mut hasher);
        hasher.finish()
    }
}
