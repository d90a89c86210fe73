//! Data-driven balance tables.
//!
//! Everything that differs by enemy type, plus the durations and odds of
//! power-ups, the UFO and the spawner, lives in one [`Tuning`] value. The
//! orchestrator and AI look numbers up here instead of switching on type.
//!
//! Tuning is plain data and can be loaded from RON:
//!
//! ```ron
//! Tuning(
//!     enemies: [
//!         EnemyStats(kind: Regular, health: 1, speed: 0.75, score: 100, bullet_power: 1,
//!                    aggressiveness: 0.3, direction_change_interval: 90, shoot_probability: 0.02),
//!         // ... one entry per enemy type, in declaration order
//!     ],
//!     ..
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::components::EnemyType;
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal_serde, Fixed};

/// Per-enemy-type stats and AI parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyStats {
    /// Which type this row describes.
    pub kind: EnemyType,
    /// Hit points.
    pub health: u32,
    /// Movement per tick in world units.
    #[serde(with = "fixed_decimal_serde")]
    pub speed: Fixed,
    /// Points awarded to the player for the kill.
    pub score: u32,
    /// Shell power (1 = brick, 2 = steel).
    pub bullet_power: u8,
    /// Probability of steering toward the player on a re-decision.
    pub aggressiveness: f64,
    /// Ticks between periodic direction re-decisions.
    pub direction_change_interval: u32,
    /// Per-tick fire probability when nothing better is in view.
    pub shoot_probability: f64,
}

impl EnemyStats {
    #[allow(clippy::too_many_arguments)]
    fn row(
        kind: EnemyType,
        health: u32,
        speed: f64,
        score: u32,
        bullet_power: u8,
        aggressiveness: f64,
        direction_change_interval: u32,
        shoot_probability: f64,
    ) -> Self {
        Self {
            kind,
            health,
            speed: Fixed::from_num(speed),
            score,
            bullet_power,
            aggressiveness,
            direction_change_interval,
            shoot_probability,
        }
    }
}

/// Player tank stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Hit points per life.
    pub health: u32,
    /// Movement per tick in world units.
    #[serde(with = "fixed_decimal_serde")]
    pub speed: Fixed,
    /// Lives at the start of a session.
    pub lives: u32,
    /// Base shell power.
    pub bullet_power: u8,
    /// Base bullets in flight.
    pub max_bullets: u32,
    /// Ticks between shots.
    pub shoot_cooldown: u32,
    /// Ticks between death and respawn.
    pub respawn_delay: u32,
    /// Shield granted on every (re)spawn.
    pub spawn_shield: u32,
}

/// Power-up durations, caps and drop odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpTuning {
    /// Ticks a dropped power-up stays on the field.
    pub lifetime: u32,
    /// Final ticks of a power-up's life during which it blinks.
    pub blink_window: u32,
    /// Odds that a non-power enemy kill drops a power-up.
    pub kill_drop_chance: f64,
    /// Shovel protection duration.
    pub shovel_duration: u32,
    /// Final ticks during which the protection flashes.
    pub shovel_flash_window: u32,
    /// Ticks between steel/brick flips while flashing.
    pub shovel_flash_period: u32,
    /// Personal shield duration from the shield pickup.
    pub shield_duration: u32,
    /// Freeze duration for either side.
    pub freeze_duration: u32,
    /// Stack cap for player star / machinegun pickups.
    pub player_stack_cap: u32,
    /// Speed multiplier added per player car pickup.
    #[serde(with = "fixed_decimal_serde")]
    pub car_step: Fixed,
    /// Maximum player speed multiplier.
    #[serde(with = "fixed_decimal_serde")]
    pub car_cap: Fixed,
    /// Speed multiplier an enemy car pickup sets.
    #[serde(with = "fixed_decimal_serde")]
    pub enemy_car_multiplier: Fixed,
    /// Lives granted by the easter egg.
    pub easter_egg_lives: u32,
    /// Ticks the easter egg stays on the field.
    pub easter_egg_lifetime: u32,
}

/// UFO behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UfoTuning {
    /// Hit points.
    pub health: u32,
    /// Ticks before the UFO escapes.
    pub lifetime: u32,
    /// Ticks between shots.
    pub shoot_interval: u32,
    /// Minimum ticks between heading changes.
    pub turn_interval_min: u32,
    /// Maximum ticks between heading changes.
    pub turn_interval_max: u32,
    /// Kills required this level before the UFO may appear.
    pub kill_gate: u32,
    /// Per-tick appearance chance once the gate is open.
    pub appear_chance: f64,
}

/// Spawner pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerTuning {
    /// Enemies on level 1.
    pub base_total: u32,
    /// Enemies added per level.
    pub total_per_level: u32,
    /// Cap on levels contributing to `total_per_level`.
    pub total_growth_levels: u32,
    /// On-screen cap on level 1.
    pub base_on_screen: u32,
    /// Hard on-screen cap.
    pub max_on_screen_cap: u32,
    /// Ticks between spawns.
    pub spawn_delay: u32,
    /// The final N enemies of a level are heavy.
    pub heavy_tail: u32,
    /// Every Nth level ends with a boss.
    pub boss_every: u32,
    /// Weights for Regular, Fast, Armored, Power.
    pub type_weights: [f64; 4],
    /// Attempts to place a spawn before giving up for the tick.
    pub spawn_attempts: u32,
}

/// Complete balance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// One row per [`EnemyType`], in [`EnemyType::ALL`] order.
    pub enemies: [EnemyStats; 6],
    /// Player stats.
    pub player: PlayerStats,
    /// Ticks between enemy shots.
    pub enemy_shoot_cooldown: u32,
    /// Power-up table.
    pub power_ups: PowerUpTuning,
    /// UFO table.
    pub ufo: UfoTuning,
    /// Spawner table.
    pub spawner: SpawnerTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        use EnemyType::{Armored, Boss, Fast, Heavy, Power, Regular};
        Self {
            enemies: [
                EnemyStats::row(Regular, 1, 0.75, 100, 1, 0.30, 90, 0.020),
                EnemyStats::row(Fast, 1, 1.5, 200, 1, 0.40, 60, 0.025),
                EnemyStats::row(Armored, 2, 0.75, 300, 1, 0.50, 100, 0.030),
                EnemyStats::row(Power, 2, 1.0, 300, 1, 0.50, 80, 0.030),
                EnemyStats::row(Heavy, 4, 0.6, 400, 2, 0.60, 120, 0.040),
                EnemyStats::row(Boss, 10, 0.5, 1000, 2, 0.80, 120, 0.050),
            ],
            player: PlayerStats {
                health: 1,
                speed: Fixed::from_num(1.25),
                lives: 3,
                bullet_power: 1,
                max_bullets: 1,
                shoot_cooldown: 20,
                respawn_delay: 120,
                spawn_shield: 180,
            },
            enemy_shoot_cooldown: 40,
            power_ups: PowerUpTuning {
                lifetime: 900,
                blink_window: 180,
                kill_drop_chance: 0.2,
                shovel_duration: 3600,
                shovel_flash_window: 180,
                shovel_flash_period: 15,
                shield_duration: 3600,
                freeze_duration: 1800,
                player_stack_cap: 3,
                car_step: Fixed::from_num(0.3),
                car_cap: Fixed::from_num(2.5),
                enemy_car_multiplier: Fixed::from_num(1.5),
                easter_egg_lives: 3,
                easter_egg_lifetime: 900,
            },
            ufo: UfoTuning {
                health: 3,
                lifetime: 1200,
                shoot_interval: 90,
                turn_interval_min: 60,
                turn_interval_max: 120,
                kill_gate: 5,
                appear_chance: 1.0 / 600.0,
            },
            spawner: SpawnerTuning {
                base_total: 20,
                total_per_level: 2,
                total_growth_levels: 10,
                base_on_screen: 4,
                max_on_screen_cap: 8,
                spawn_delay: 150,
                heavy_tail: 6,
                boss_every: 5,
                type_weights: [0.50, 0.20, 0.15, 0.15],
                spawn_attempts: 3,
            },
        }
    }
}

impl Tuning {
    /// Stats row for an enemy type.
    #[must_use]
    pub fn enemy(&self, kind: EnemyType) -> &EnemyStats {
        &self.enemies[kind.index()]
    }

    /// Parse tuning from a RON document and validate it.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let tuning: Self =
            ron::from_str(source).map_err(|e| GameError::TuningParse(e.to_string()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a RON file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| GameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&source)
    }

    /// Render as pretty RON (used by the headless `tuning` command).
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::TuningParse(e.to_string()))
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        for (expected, row) in EnemyType::ALL.iter().zip(self.enemies.iter()) {
            if row.kind != *expected {
                return Err(GameError::TuningParse(format!(
                    "enemy table out of order: expected {expected:?}, found {:?}",
                    row.kind
                )));
            }
            if row.health == 0 {
                return Err(GameError::TuningParse(format!(
                    "{expected:?} must have at least 1 health"
                )));
            }
            if row.direction_change_interval == 0 {
                return Err(GameError::TuningParse(format!(
                    "{expected:?} direction_change_interval must be positive"
                )));
            }
        }
        if self.player.health == 0 || self.player.max_bullets == 0 {
            return Err(GameError::TuningParse(
                "player needs health and at least one bullet".to_string(),
            ));
        }
        if self.spawner.base_on_screen == 0 {
            return Err(GameError::TuningParse(
                "spawner must allow at least one enemy on screen".to_string(),
            ));
        }
        if self.ufo.turn_interval_min > self.ufo.turn_interval_max {
            return Err(GameError::TuningParse(
                "ufo turn interval min exceeds max".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        Tuning::default().validate().unwrap();
    }

    #[test]
    fn test_lookup_by_type() {
        let tuning = Tuning::default();
        for kind in EnemyType::ALL {
            assert_eq!(tuning.enemy(kind).kind, kind);
        }
        assert_eq!(tuning.enemy(EnemyType::Heavy).health, 4);
        assert_eq!(tuning.enemy(EnemyType::Boss).score, 1000);
    }

    #[test]
    fn test_ron_roundtrip() {
        let tuning = Tuning::default();
        let text = tuning.to_ron_string().unwrap();
        let parsed = Tuning::from_ron_str(&text).unwrap();
        assert_eq!(parsed.enemy(EnemyType::Fast).speed, Fixed::from_num(1.5));
        assert_eq!(parsed.spawner, tuning.spawner);
    }

    #[test]
    fn test_rejects_misordered_table() {
        let mut tuning = Tuning::default();
        tuning.enemies.swap(0, 1);
        assert!(matches!(tuning.validate(), Err(GameError::TuningParse(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Tuning::from_ron_str("not ron at all (").is_err());
    }
}
