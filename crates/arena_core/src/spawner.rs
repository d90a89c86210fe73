//! Enemy population control.
//!
//! A level has a fixed roster (`total_enemies`) released one at a time
//! through three spawn points, never exceeding `max_on_screen` living
//! enemies. Tank pickups by enemies queue extra tanks on top of the roster;
//! that queue is independent and is served ahead of the roster whenever
//! the cap and cooldown allow.

use serde::{Deserialize, Serialize};

use crate::components::EnemyType;
use crate::entities::TANK_SIZE;
use crate::error::{GameError, Result};
use crate::math::{boxes_overlap, Vec2Fixed};
use crate::rng::SeededRandom;
use crate::tile_map::{TileMap, ENEMY_SPAWN_RECTS};
use crate::tuning::SpawnerTuning;

/// A tank the spawner wants placed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnOrder {
    /// Type to create.
    pub kind: EnemyType,
    /// Center of the chosen spawn point.
    pub position: Vec2Fixed,
    /// Drawn from the extra queue rather than the roster.
    pub extra: bool,
}

/// Per-level spawner state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spawner {
    level: u32,
    total_enemies: u32,
    max_on_screen: u32,
    spawned: u32,
    extra_queued: u32,
    spawn_cooldown: u32,
    config: SpawnerTuning,
}

impl Spawner {
    /// Spawner for `level` (1-based).
    pub fn new(level: u32, config: &SpawnerTuning) -> Result<Self> {
        if level == 0 {
            return Err(GameError::InvalidLevel(level));
        }
        let steps = level - 1;
        let total_enemies =
            config.base_total + config.total_per_level * steps.min(config.total_growth_levels);
        let max_on_screen = (config.base_on_screen + steps / 2).min(config.max_on_screen_cap);
        Ok(Self {
            level,
            total_enemies,
            max_on_screen,
            spawned: 0,
            extra_queued: 0,
            spawn_cooldown: 0,
            config: config.clone(),
        })
    }

    /// Roster size for the level.
    #[must_use]
    pub const fn total_enemies(&self) -> u32 {
        self.total_enemies
    }

    /// Living-enemy cap.
    #[must_use]
    pub const fn max_on_screen(&self) -> u32 {
        self.max_on_screen
    }

    /// Roster tanks released so far.
    #[must_use]
    pub const fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Extra tanks waiting to be released.
    #[must_use]
    pub const fn extra_queued(&self) -> u32 {
        self.extra_queued
    }

    /// Enemies not yet on the field: `total - spawned + extra_queued`.
    #[must_use]
    pub const fn remaining_enemies(&self) -> u32 {
        self.total_enemies - self.spawned + self.extra_queued
    }

    /// True when the roster is out and no extras are waiting.
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.spawned >= self.total_enemies && self.extra_queued == 0
    }

    /// Queue one extra tank.
    pub fn enqueue_extra(&mut self) {
        self.extra_queued += 1;
    }

    /// Suspend spawning for `ticks` ticks.
    pub fn hold(&mut self, ticks: u32) {
        self.spawn_cooldown = ticks;
    }

    /// Type for the next roster tank.
    fn roster_type(&self, rng: &mut SeededRandom) -> EnemyType {
        let index = self.spawned;
        let boss_level = self.config.boss_every > 0 && self.level % self.config.boss_every == 0;
        if boss_level && index + 1 == self.total_enemies {
            return EnemyType::Boss;
        }
        if index + self.config.heavy_tail >= self.total_enemies {
            return EnemyType::Heavy;
        }
        EnemyType::EXTRA_POOL[rng.weighted_index(&self.config.type_weights)]
    }

    /// First free spawn point in random order.
    fn find_spawn_point(
        &self,
        map: &TileMap,
        occupied: &[Vec2Fixed],
        rng: &mut SeededRandom,
    ) -> Option<Vec2Fixed> {
        let mut order: Vec<usize> = (0..ENEMY_SPAWN_RECTS.len()).collect();
        rng.shuffle(&mut order);
        order
            .into_iter()
            .take(self.config.spawn_attempts as usize)
            .map(|i| ENEMY_SPAWN_RECTS[i].center())
            .find(|pos| {
                !map.check_tank_collision(*pos, TANK_SIZE, false)
                    && !occupied
                        .iter()
                        .any(|other| boxes_overlap(*pos, TANK_SIZE, *other, TANK_SIZE))
            })
    }

    /// Advance one tick and maybe release a tank.
    ///
    /// `on_screen` counts living enemies; `occupied` lists every live tank.
    /// A blocked spawn search releases nothing and keeps the cooldown at 0
    /// so the next tick tries again.
    pub fn update(
        &mut self,
        on_screen: u32,
        map: &TileMap,
        occupied: &[Vec2Fixed],
        rng: &mut SeededRandom,
    ) -> Option<SpawnOrder> {
        if self.spawn_cooldown > 0 {
            self.spawn_cooldown -= 1;
            return None;
        }
        if on_screen >= self.max_on_screen {
            return None;
        }
        // Extras wait on the cap and cooldown only, never on the roster.
        let extra = if self.extra_queued > 0 {
            true
        } else if self.spawned < self.total_enemies {
            false
        } else {
            return None;
        };
        let Some(position) = self.find_spawn_point(map, occupied, rng) else {
            tracing::trace!(level = self.level, "All spawn points blocked");
            return None;
        };
        let kind = if extra {
            self.extra_queued -= 1;
            *rng.pick(&EnemyType::EXTRA_POOL).unwrap_or(&EnemyType::Regular)
        } else {
            let kind = self.roster_type(rng);
            self.spawned += 1;
            kind
        };
        self.spawn_cooldown = self.config.spawn_delay;
        Some(SpawnOrder {
            kind,
            position,
            extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    fn spawner(level: u32) -> Spawner {
        Spawner::new(level, &Tuning::default().spawner).unwrap()
    }

    #[test]
    fn test_level_scaling() {
        assert_eq!(spawner(1).total_enemies(), 20);
        assert_eq!(spawner(1).max_on_screen(), 4);
        assert_eq!(spawner(4).total_enemies(), 26);
        assert_eq!(spawner(4).max_on_screen(), 5);
        assert_eq!(spawner(11).total_enemies(), 40);
        assert_eq!(spawner(30).total_enemies(), 40);
        assert_eq!(spawner(30).max_on_screen(), 8);
    }

    #[test]
    fn test_level_zero_rejected() {
        assert!(matches!(
            Spawner::new(0, &Tuning::default().spawner),
            Err(GameError::InvalidLevel(0))
        ));
    }

    #[test]
    fn test_roster_tail_and_boss() {
        let map = TileMap::bordered();
        let mut rng = SeededRandom::new(1);
        let mut s = spawner(5);
        let mut kinds = Vec::new();
        while !s.exhausted() {
            if let Some(order) = s.update(0, &map, &[], &mut rng) {
                kinds.push(order.kind);
            }
        }
        assert_eq!(kinds.len(), s.total_enemies() as usize);
        assert_eq!(kinds.last(), Some(&EnemyType::Boss));
        let tail = &kinds[kinds.len() - 6..kinds.len() - 1];
        assert!(tail.iter().all(|k| *k == EnemyType::Heavy));
        assert!(kinds[..kinds.len() - 6]
            .iter()
            .all(|k| EnemyType::EXTRA_POOL.contains(k)));
    }

    #[test]
    fn test_cap_and_cooldown() {
        let map = TileMap::bordered();
        let mut rng = SeededRandom::new(2);
        let mut s = spawner(1);
        assert!(s.update(4, &map, &[], &mut rng).is_none());
        assert!(s.update(0, &map, &[], &mut rng).is_some());
        for _ in 0..150 {
            assert!(s.update(0, &map, &[], &mut rng).is_none());
        }
        assert!(s.update(0, &map, &[], &mut rng).is_some());
    }

    #[test]
    fn test_blocked_points_spawn_nothing() {
        let map = TileMap::bordered();
        let mut rng = SeededRandom::new(3);
        let mut s = spawner(1);
        let occupied: Vec<Vec2Fixed> = ENEMY_SPAWN_RECTS.iter().map(|r| r.center()).collect();
        assert!(s.update(0, &map, &occupied, &mut rng).is_none());
        assert_eq!(s.spawned(), 0);
        assert!(s.update(0, &map, &[], &mut rng).is_some());
    }

    #[test]
    fn test_extra_released_before_roster_finishes() {
        let map = TileMap::bordered();
        let mut rng = SeededRandom::new(4);
        let mut s = spawner(1);
        s.enqueue_extra();
        assert_eq!(s.remaining_enemies(), 21);

        let first = s.update(0, &map, &[], &mut rng).unwrap();
        assert!(first.extra);
        assert!(EnemyType::EXTRA_POOL.contains(&first.kind));
        assert_eq!(s.spawned(), 0);
        assert_eq!(s.remaining_enemies(), 20);

        let mut extras = 1;
        while !s.exhausted() {
            if let Some(order) = s.update(0, &map, &[], &mut rng) {
                if order.extra {
                    extras += 1;
                }
            }
            assert_eq!(
                s.remaining_enemies(),
                s.total_enemies() - s.spawned() + s.extra_queued()
            );
        }
        assert_eq!(extras, 1);
        assert_eq!(s.remaining_enemies(), 0);
    }

    #[test]
    fn test_extra_queued_mid_roster() {
        let map = TileMap::bordered();
        let mut rng = SeededRandom::new(5);
        let mut s = spawner(1);
        assert!(!s.update(0, &map, &[], &mut rng).unwrap().extra);
        s.enqueue_extra();
        s.hold(0);
        let order = s.update(0, &map, &[], &mut rng).unwrap();
        assert!(order.extra);
        assert_eq!(s.spawned(), 1);
        s.hold(0);
        assert!(!s.update(0, &map, &[], &mut rng).unwrap().extra);
        assert_eq!(s.spawned(), 2);
    }

    #[test]
    fn test_extra_respects_cap() {
        let map = TileMap::bordered();
        let mut rng = SeededRandom::new(6);
        let mut s = spawner(1);
        s.enqueue_extra();
        assert!(s.update(s.max_on_screen(), &map, &[], &mut rng).is_none());
        assert_eq!(s.extra_queued(), 1);
    }
}
