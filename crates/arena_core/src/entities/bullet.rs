//! Shells in flight.

use serde::{Deserialize, Serialize};

use crate::components::{BulletSide, Direction, EntityId};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::storage::Identified;
use crate::tile_map::{world_height, world_width};

/// A shell in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    /// Assigned by storage.
    pub id: EntityId,
    /// Center.
    pub position: Vec2Fixed,
    /// Travel direction.
    pub direction: Direction,
    /// Firing tank; `None` for UFO shots. May go stale.
    pub owner: Option<EntityId>,
    /// Which side fired it.
    pub side: BulletSide,
    /// 1 breaks brick, 2 also breaks steel.
    pub power: u8,
    /// Units per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
}

impl Identified for Bullet {
    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

impl Bullet {
    /// A new bullet; the ID is assigned on insert.
    #[must_use]
    pub const fn new(
        position: Vec2Fixed,
        direction: Direction,
        owner: Option<EntityId>,
        side: BulletSide,
        power: u8,
        speed: Fixed,
    ) -> Self {
        Self {
            id: 0,
            position,
            direction,
            owner,
            side,
            power,
            speed,
        }
    }

    /// Move one tick along the travel direction.
    pub fn advance(&mut self) {
        self.position += self.direction.unit().scale(self.speed);
    }

    /// Whether the center has left the world.
    #[must_use]
    pub fn out_of_bounds(&self) -> bool {
        self.position.x < Fixed::ZERO
            || self.position.y < Fixed::ZERO
            || self.position.x >= world_width()
            || self.position.y >= world_height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::fx;

    #[test]
    fn test_advance_and_bounds() {
        let mut bullet = Bullet::new(
            Vec2Fixed::from_ints(10, 6),
            Direction::Down,
            Some(1),
            BulletSide::Player,
            1,
            fx(4),
        );
        bullet.advance();
        assert_eq!(bullet.position, Vec2Fixed::from_ints(10, 2));
        assert!(!bullet.out_of_bounds());
        bullet.advance();
        assert!(bullet.out_of_bounds());
    }
}
