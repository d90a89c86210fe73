//! Enemy tank decision making.
//!
//! Each enemy owns one [`AiController`]. Every tick the simulation hands it
//! a read-only [`AiContext`] describing the world around the tank and gets
//! back an [`AiIntent`]: a heading to drive toward and whether to fire.
//!
//! All randomness comes from the level's gameplay stream, so a controller
//! makes the same choices for the same seed and inputs.

use serde::{Deserialize, Serialize};

use crate::components::{Direction, EntityId};
use crate::entities::TANK_SIZE;
use crate::math::{boxes_overlap, fixed_serde, fx, Fixed, Vec2Fixed};
use crate::rng::SeededRandom;
use crate::tile_map::{TileMap, TileType};
use crate::tuning::EnemyStats;

/// Movement below this per tick counts as not moving.
const STUCK_EPSILON: Fixed = Fixed::from_bits(1 << 31);
/// Consecutive stuck ticks before forcing a turn.
const STUCK_LIMIT: u32 = 20;
/// Odds of acting on a scheduled re-decision.
const REDECIDE_CHANCE: f64 = 0.7;
/// Ticks a heading must be held before spontaneous turns start.
const RESTLESS_AFTER: u32 = 30;
/// Per-tick odds of a spontaneous turn once restless.
const RESTLESS_CHANCE: f64 = 0.02;
/// Bias toward heading down when not chasing.
const DOWN_BIAS: f64 = 0.3;
/// Down tie-break weight among open headings.
const DOWN_TIE_BREAK: f64 = 0.35;

const PLAYER_LANE: Fixed = fx(200);
const PLAYER_LANE_CHANCE: f64 = 0.35;
const BASE_LANE: Fixed = fx(250);
const BASE_LANE_CHANCE: f64 = 0.40;
const OBSTACLE_SCAN: Fixed = fx(120);
const WALL_SHOT_RANGE: Fixed = fx(80);
const WALL_SHOT_CHANCE: f64 = 0.03;
const WALL_SHOT_COOLDOWN: u32 = 45;

/// Read-only view of the world for one enemy's decision.
#[derive(Debug, Clone, Copy)]
pub struct AiContext<'a> {
    /// The deciding tank.
    pub id: EntityId,
    /// Its center.
    pub position: Vec2Fixed,
    /// Its heading.
    pub facing: Direction,
    /// How far it moves in one tick.
    pub step: Fixed,
    /// Whether water is passable for it.
    pub can_swim: bool,
    /// Terrain.
    pub map: &'a TileMap,
    /// Every live tank, the deciding one included.
    pub tanks: &'a [(EntityId, Vec2Fixed)],
    /// Centers of living players.
    pub players: &'a [Vec2Fixed],
    /// Center of the base, if it still stands.
    pub base: Option<Vec2Fixed>,
}

impl AiContext<'_> {
    /// Whether a probe one step ahead in `dir` is free of terrain and tanks.
    #[must_use]
    pub fn is_open(&self, dir: Direction) -> bool {
        let probe = self.position + dir.unit().scale(self.step.max(Fixed::ONE));
        if self.map.check_tank_collision(probe, TANK_SIZE, self.can_swim) {
            return false;
        }
        !self.tanks.iter().any(|(other, pos)| {
            *other != self.id
                && boxes_overlap(probe, TANK_SIZE, *pos, TANK_SIZE)
                && probe.distance_squared(*pos) < self.position.distance_squared(*pos)
        })
    }

    /// Headings that pass [`Self::is_open`], in [`Direction::ALL`] order.
    #[must_use]
    pub fn open_headings(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|dir| self.is_open(*dir))
            .collect()
    }

    fn nearest_player(&self) -> Option<Vec2Fixed> {
        self.players
            .iter()
            .copied()
            .min_by_key(|p| p.manhattan_distance(self.position))
    }

    /// Distance along the facing to `target` if it sits in the tank's lane.
    fn lane_distance(&self, target: Vec2Fixed) -> Option<Fixed> {
        let delta = target - self.position;
        let half = TANK_SIZE / fx(2);
        let (along, across) = match self.facing {
            Direction::Up => (delta.y, delta.x),
            Direction::Down => (-delta.y, delta.x),
            Direction::Left => (-delta.x, delta.y),
            Direction::Right => (delta.x, delta.y),
        };
        (along > Fixed::ZERO && across.abs() < half).then_some(along)
    }
}

/// What the enemy wants to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiIntent {
    /// Heading to drive.
    pub movement: Direction,
    /// Pull the trigger.
    pub fire: bool,
}

/// Per-enemy brain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiController {
    aggressiveness: f64,
    direction_change_interval: u32,
    shoot_probability: f64,
    decision_timer: u32,
    held_ticks: u32,
    stuck_ticks: u32,
    wall_shot_cooldown: u32,
    last_position: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    last_step: Fixed,
}

impl AiController {
    /// A controller parameterized from an enemy stats row.
    #[must_use]
    pub fn new(stats: &EnemyStats, position: Vec2Fixed) -> Self {
        Self {
            aggressiveness: stats.aggressiveness,
            direction_change_interval: stats.direction_change_interval,
            shoot_probability: stats.shoot_probability,
            decision_timer: 0,
            held_ticks: 0,
            stuck_ticks: 0,
            wall_shot_cooldown: 0,
            last_position: position,
            last_step: Fixed::ZERO,
        }
    }

    /// Swap in another type's parameters, keeping the running state.
    pub fn retune(&mut self, stats: &EnemyStats) {
        self.aggressiveness = stats.aggressiveness;
        self.direction_change_interval = stats.direction_change_interval;
        self.shoot_probability = stats.shoot_probability;
    }

    /// Consecutive ticks the tank has failed to move.
    #[must_use]
    pub const fn stuck_ticks(&self) -> u32 {
        self.stuck_ticks
    }

    /// Decide this tick's heading and trigger.
    pub fn decide(&mut self, ctx: &AiContext<'_>, rng: &mut SeededRandom) -> AiIntent {
        self.last_step = ctx.position.manhattan_distance(self.last_position);
        self.last_position = ctx.position;
        if self.last_step < STUCK_EPSILON {
            self.stuck_ticks += 1;
        } else {
            self.stuck_ticks = 0;
        }
        self.held_ticks += 1;
        self.decision_timer += 1;
        self.wall_shot_cooldown = self.wall_shot_cooldown.saturating_sub(1);

        let movement = self.choose_heading(ctx, rng);
        if movement != ctx.facing {
            self.held_ticks = 0;
        }
        let aimed = AiContext {
            facing: movement,
            ..*ctx
        };
        let fire = self.should_fire(&aimed, rng);
        AiIntent { movement, fire }
    }

    fn choose_heading(&mut self, ctx: &AiContext<'_>, rng: &mut SeededRandom) -> Direction {
        if self.stuck_ticks > STUCK_LIMIT {
            self.stuck_ticks = 0;
            let escape: Vec<Direction> = ctx
                .open_headings()
                .into_iter()
                .filter(|d| *d != ctx.facing)
                .collect();
            return rng
                .pick(&escape)
                .copied()
                .unwrap_or_else(|| ctx.facing.opposite());
        }

        let mut redecide = false;
        if self.decision_timer >= self.direction_change_interval {
            self.decision_timer = 0;
            redecide = rng.chance(REDECIDE_CHANCE);
        }
        if !redecide && self.held_ticks > RESTLESS_AFTER {
            redecide = rng.chance(RESTLESS_CHANCE);
        }
        if !redecide {
            return ctx.facing;
        }

        let open = ctx.open_headings();
        if let Some(target) = ctx.nearest_player() {
            if rng.chance(self.aggressiveness) {
                let toward = heading_toward(ctx.position, target);
                if open.contains(&toward) {
                    return toward;
                }
            }
        }
        let down_open = open.contains(&Direction::Down);
        if down_open && rng.chance(DOWN_BIAS) {
            return Direction::Down;
        }
        if down_open && rng.chance(DOWN_TIE_BREAK) {
            return Direction::Down;
        }
        let others: Vec<Direction> = open
            .iter()
            .copied()
            .filter(|d| *d != Direction::Down)
            .collect();
        match rng.pick(&others) {
            Some(dir) => *dir,
            None if down_open => Direction::Down,
            None => ctx.facing,
        }
    }

    fn should_fire(&mut self, ctx: &AiContext<'_>, rng: &mut SeededRandom) -> bool {
        if self.wall_shot_cooldown > 0 {
            return false;
        }

        for player in ctx.players {
            if let Some(dist) = ctx.lane_distance(*player) {
                if dist <= PLAYER_LANE && !steel_before(ctx, dist) {
                    return rng.chance(PLAYER_LANE_CHANCE);
                }
            }
        }

        if let Some(base) = ctx.base {
            if ctx.lane_distance(base).is_some_and(|d| d <= BASE_LANE) {
                return rng.chance(BASE_LANE_CHANCE);
            }
        }

        let ahead = ctx
            .map
            .scan_line(ctx.position, ctx.facing, OBSTACLE_SCAN)
            .into_iter()
            .find(|(_, tile)| *tile != TileType::Empty);
        match ahead {
            Some((dist, TileType::Brick)) if dist <= WALL_SHOT_RANGE => {
                let fire = rng.chance(WALL_SHOT_CHANCE);
                if fire {
                    self.wall_shot_cooldown = WALL_SHOT_COOLDOWN;
                }
                fire
            }
            Some((_, TileType::Steel | TileType::Water)) => false,
            _ => rng.chance(self.shoot_probability),
        }
    }
}

fn steel_before(ctx: &AiContext<'_>, dist: Fixed) -> bool {
    ctx.map
        .scan_line(ctx.position, ctx.facing, dist)
        .iter()
        .any(|(_, tile)| *tile == TileType::Steel)
}

/// Dominant-axis heading from `from` toward `to`.
#[must_use]
pub fn heading_toward(from: Vec2Fixed, to: Vec2Fixed) -> Direction {
    let delta = to - from;
    if delta.x.abs() > delta.y.abs() {
        if delta.x > Fixed::ZERO {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if delta.y > Fixed::ZERO {
        Direction::Up
    } else {
        Direction::Down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::EnemyType;
    use crate::tile_map::Cell;
    use crate::tuning::Tuning;

    fn controller(kind: EnemyType, pos: Vec2Fixed) -> AiController {
        AiController::new(Tuning::default().enemy(kind), pos)
    }

    fn ctx<'a>(
        map: &'a TileMap,
        tanks: &'a [(EntityId, Vec2Fixed)],
        players: &'a [Vec2Fixed],
        facing: Direction,
    ) -> AiContext<'a> {
        AiContext {
            id: tanks[0].0,
            position: tanks[0].1,
            facing,
            step: fx(1),
            can_swim: false,
            map,
            tanks,
            players,
            base: None,
        }
    }

    #[test]
    fn test_heading_toward() {
        let o = Vec2Fixed::from_ints(100, 100);
        assert_eq!(heading_toward(o, Vec2Fixed::from_ints(200, 120)), Direction::Right);
        assert_eq!(heading_toward(o, Vec2Fixed::from_ints(90, 20)), Direction::Down);
        assert_eq!(heading_toward(o, Vec2Fixed::from_ints(100, 300)), Direction::Up);
    }

    #[test]
    fn test_open_headings_respect_walls_and_tanks() {
        let mut map = TileMap::bordered();
        // Flush against the right edge of its cell.
        let pos = Cell::new(12, 12).center() + Vec2Fixed::from_ints(1, 0);
        map.set_tile(Cell::new(12, 13), TileType::Steel);
        let tanks = [(1, pos), (2, pos + Vec2Fixed::from_ints(-14, 0))];
        let view = ctx(&map, &tanks, &[], Direction::Down);
        let open = view.open_headings();
        assert!(!open.contains(&Direction::Right));
        assert!(!open.contains(&Direction::Left));
        assert!(open.contains(&Direction::Up));
        assert!(open.contains(&Direction::Down));
    }

    #[test]
    fn test_stuck_tank_turns_away() {
        let map = TileMap::bordered();
        let pos = Cell::new(12, 12).center();
        let tanks = [(1, pos)];
        let view = ctx(&map, &tanks, &[], Direction::Down);
        let mut ai = controller(EnemyType::Regular, pos);
        let mut rng = SeededRandom::new(4);
        let mut turned = None;
        for _ in 0..=STUCK_LIMIT + 1 {
            let intent = ai.decide(&view, &mut rng);
            if intent.movement != Direction::Down {
                turned = Some(intent.movement);
                break;
            }
        }
        assert!(turned.is_some());
    }

    #[test]
    fn test_no_fire_at_steel_wall() {
        let mut map = TileMap::bordered();
        let cell = Cell::new(12, 12);
        map.set_tile(Cell::new(13, 12), TileType::Steel);
        let tanks = [(1, cell.center())];
        let view = ctx(&map, &tanks, &[], Direction::Down);
        let mut ai = controller(EnemyType::Boss, cell.center());
        let mut rng = SeededRandom::new(11);
        for _ in 0..500 {
            assert!(!ai.should_fire(&view, &mut rng));
        }
    }

    #[test]
    fn test_fires_at_player_in_lane() {
        let map = TileMap::bordered();
        let pos = Cell::new(5, 12).center();
        let player = Cell::new(12, 12).center();
        let tanks = [(1, pos)];
        let players = [player];
        let view = ctx(&map, &tanks, &players, Direction::Down);
        let mut ai = controller(EnemyType::Regular, pos);
        let mut rng = SeededRandom::new(3);
        let shots = (0..1000).filter(|_| ai.should_fire(&view, &mut rng)).count();
        assert!((250..450).contains(&shots), "shots = {shots}");
    }

    #[test]
    fn test_wall_shot_cooldown_suppresses_fire() {
        let mut map = TileMap::bordered();
        let cell = Cell::new(12, 12);
        map.set_tile(Cell::new(14, 12), TileType::Brick);
        let tanks = [(1, cell.center())];
        let view = ctx(&map, &tanks, &[], Direction::Down);
        let mut ai = controller(EnemyType::Regular, cell.center());
        let mut rng = SeededRandom::new(21);
        let mut fired_at = None;
        for i in 0..2000 {
            if ai.should_fire(&view, &mut rng) {
                fired_at = Some(i);
                break;
            }
        }
        assert!(fired_at.is_some());
        assert_eq!(ai.wall_shot_cooldown, WALL_SHOT_COOLDOWN);
        assert!(!ai.should_fire(&view, &mut rng));
    }

    #[test]
    fn test_retune_keeps_state() {
        let tuning = Tuning::default();
        let mut ai = controller(EnemyType::Regular, Vec2Fixed::ZERO);
        ai.stuck_ticks = 7;
        ai.retune(tuning.enemy(EnemyType::Heavy));
        assert_eq!(ai.stuck_ticks(), 7);
        assert_eq!(ai.direction_change_interval, 120);
    }
}
