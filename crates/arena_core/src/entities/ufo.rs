//! The bonus UFO: cruise, dive, fire and escape.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, fx, Fixed, Vec2Fixed};
use crate::rng::SeededRandom;
use crate::tile_map::{world_height, world_width, TILE_SIZE};
use crate::timers::TimedEffect;
use crate::tuning::UfoTuning;

use super::UFO_SIZE;

/// Horizontal cruising speed in units per tick.
const CRUISE_SPEED: Fixed = fx(1);

/// What the UFO wants the simulation to do after an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UfoAction {
    /// Drop a bullet straight down from the UFO's center.
    pub fire: bool,
    /// Lifetime ran out; remove the UFO.
    pub escaped: bool,
}

/// The flying intruder. It ignores terrain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ufo {
    /// Center.
    pub position: Vec2Fixed,
    /// Displacement per tick.
    pub velocity: Vec2Fixed,
    /// Hits left.
    pub health: u32,
    lifetime: TimedEffect<()>,
    shoot_cooldown: u32,
    turn_cooldown: u32,
    #[serde(with = "fixed_serde")]
    floor_y: Fixed,
}

impl Ufo {
    /// Enter at the top edge, on the left or right, heading across.
    pub fn enter(rng: &mut SeededRandom, tuning: &UfoTuning) -> Self {
        let half = UFO_SIZE / fx(2);
        let from_left = rng.next_bool();
        let x = if from_left { half } else { world_width() - half };
        let y = world_height() - TILE_SIZE - half;
        let heading = if from_left { CRUISE_SPEED } else { -CRUISE_SPEED };
        Self {
            position: Vec2Fixed::new(x, y),
            velocity: Vec2Fixed::new(heading, Fixed::ZERO),
            health: tuning.health,
            lifetime: TimedEffect::new(tuning.lifetime, ()),
            shoot_cooldown: tuning.shoot_interval,
            turn_cooldown: Self::roll_turn_interval(rng, tuning),
            floor_y: world_height() / fx(2),
        }
    }

    fn roll_turn_interval(rng: &mut SeededRandom, tuning: &UfoTuning) -> u32 {
        rng.range_inclusive(tuning.turn_interval_min as i32, tuning.turn_interval_max as i32)
            .max(1) as u32
    }

    /// Take one hit. True exactly on the hit that brings health to 0.
    pub fn damage(&mut self) -> bool {
        if self.health == 0 {
            return false;
        }
        self.health -= 1;
        self.health == 0
    }

    /// Ticks until the UFO escapes.
    #[must_use]
    pub const fn remaining_lifetime(&self) -> u32 {
        self.lifetime.remaining()
    }

    /// Move, bounce off the flight box, wobble and count down.
    pub fn update(&mut self, rng: &mut SeededRandom, tuning: &UfoTuning) -> UfoAction {
        let mut action = UfoAction::default();
        if self.lifetime.tick().is_some() {
            action.escaped = true;
            return action;
        }

        self.position += self.velocity;
        let half = UFO_SIZE / fx(2);
        let max_x = world_width() - half;
        let max_y = world_height() - TILE_SIZE - half;
        if self.position.x <= half || self.position.x >= max_x {
            self.position.x = self.position.x.clamp(half, max_x);
            self.velocity.x = -self.velocity.x;
        }
        if self.position.y <= self.floor_y || self.position.y >= max_y {
            self.position.y = self.position.y.clamp(self.floor_y, max_y);
            self.velocity.y = -self.velocity.y;
        }

        self.turn_cooldown = self.turn_cooldown.saturating_sub(1);
        if self.turn_cooldown == 0 {
            let drift = [fx(-1) / fx(2), Fixed::ZERO, fx(1) / fx(2)];
            self.velocity.y = rng.pick(&drift).copied().unwrap_or(Fixed::ZERO);
            if rng.chance(0.3) {
                self.velocity.x = -self.velocity.x;
            }
            self.turn_cooldown = Self::roll_turn_interval(rng, tuning);
        }

        self.shoot_cooldown = self.shoot_cooldown.saturating_sub(1);
        if self.shoot_cooldown == 0 {
            action.fire = true;
            self.shoot_cooldown = tuning.shoot_interval;
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    #[test]
    fn test_damage_reports_only_the_killing_hit() {
        let tuning = Tuning::default().ufo;
        let mut rng = SeededRandom::new(1);
        let mut ufo = Ufo::enter(&mut rng, &tuning);
        assert_eq!(ufo.health, 3);
        assert!(!ufo.damage());
        assert!(!ufo.damage());
        assert!(ufo.damage());
        assert!(!ufo.damage());
    }

    #[test]
    fn test_stays_in_flight_box_and_fires() {
        let tuning = Tuning::default().ufo;
        let mut rng = SeededRandom::new(8);
        let mut ufo = Ufo::enter(&mut rng, &tuning);
        let mut shots = 0;
        for _ in 0..600 {
            let action = ufo.update(&mut rng, &tuning);
            assert!(!action.escaped);
            if action.fire {
                shots += 1;
            }
            assert!(ufo.position.x >= UFO_SIZE / fx(2));
            assert!(ufo.position.x <= world_width() - UFO_SIZE / fx(2));
            assert!(ufo.position.y >= world_height() / fx(2));
        }
        assert_eq!(shots, 600 / tuning.shoot_interval);
    }

    #[test]
    fn test_escapes_after_lifetime() {
        let tuning = UfoTuning {
            lifetime: 3,
            ..Tuning::default().ufo
        };
        let mut rng = SeededRandom::new(2);
        let mut ufo = Ufo::enter(&mut rng, &tuning);
        assert!(!ufo.update(&mut rng, &tuning).escaped);
        assert!(!ufo.update(&mut rng, &tuning).escaped);
        assert!(ufo.update(&mut rng, &tuning).escaped);
    }
}
