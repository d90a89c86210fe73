//! Entity models owned by the simulation.
//!
//! Entities never own each other. A bullet names its firing tank by
//! [`EntityId`](crate::components::EntityId) and the simulation resolves it.

mod bullet;
mod pickups;
mod tank;
mod ufo;

pub use bullet::Bullet;
pub use pickups::{EasterEgg, PowerUp};
pub use tank::{HitOutcome, Tank};
pub use ufo::{Ufo, UfoAction};

use serde::{Deserialize, Serialize};

use crate::math::{fx, Fixed, Vec2Fixed};
use crate::tile_map::base_position;

/// Collision box edge of every tank, boss included.
pub const TANK_SIZE: Fixed = fx(14);
/// Bullet diameter.
pub const BULLET_SIZE: Fixed = fx(4);
/// Bullet speed before star stacks.
pub const BULLET_SPEED: Fixed = fx(4);
/// Base collision box edge.
pub const BASE_SIZE: Fixed = fx(16);
/// Power-up collision box edge.
pub const POWER_UP_SIZE: Fixed = fx(14);
/// UFO collision box edge.
pub const UFO_SIZE: Fixed = fx(24);
/// Easter egg collision box edge.
pub const EASTER_EGG_SIZE: Fixed = fx(14);

/// The eagle the player defends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    /// Center of the base tile.
    pub position: Vec2Fixed,
    /// Set once; a destroyed base ends the level.
    pub destroyed: bool,
}

impl Default for Base {
    fn default() -> Self {
        Self {
            position: base_position(),
            destroyed: false,
        }
    }
}

impl Base {
    /// Whether a point lies inside the base's half-extent.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        self.position.within_box(point, BASE_SIZE / fx(2))
    }
}
