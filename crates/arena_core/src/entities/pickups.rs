//! Power-ups and the easter egg lying on the map.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PowerUpKind};
use crate::math::Vec2Fixed;
use crate::storage::Identified;
use crate::timers::TimedEffect;

/// A collectible lying on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUp {
    /// Assigned by storage.
    pub id: EntityId,
    /// Effect on pickup.
    pub kind: PowerUpKind,
    /// Center.
    pub position: Vec2Fixed,
    lifetime: TimedEffect<()>,
}

impl Identified for PowerUp {
    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

impl PowerUp {
    /// A power-up that disappears after `lifetime` ticks.
    #[must_use]
    pub const fn new(kind: PowerUpKind, position: Vec2Fixed, lifetime: u32) -> Self {
        Self {
            id: 0,
            kind,
            position,
            lifetime: TimedEffect::new(lifetime, ()),
        }
    }

    /// Advance the lifetime; true on the tick it expires.
    pub fn tick(&mut self) -> bool {
        self.lifetime.tick().is_some()
    }

    /// Ticks until expiry.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.lifetime.remaining()
    }

    /// Whether the power-up is in its final blinking window.
    #[must_use]
    pub const fn is_blinking(&self, blink_window: u32) -> bool {
        self.lifetime.remaining() <= blink_window
    }
}

/// The bonus left behind by a destroyed UFO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EasterEgg {
    /// Center.
    pub position: Vec2Fixed,
    lifetime: TimedEffect<()>,
}

impl EasterEgg {
    /// An egg that disappears after `lifetime` ticks.
    #[must_use]
    pub const fn new(position: Vec2Fixed, lifetime: u32) -> Self {
        Self {
            position,
            lifetime: TimedEffect::new(lifetime, ()),
        }
    }

    /// Advance the lifetime; true on the tick it expires.
    pub fn tick(&mut self) -> bool {
        self.lifetime.tick().is_some()
    }

    /// Ticks until expiry.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.lifetime.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_up_blinks_then_expires() {
        let mut p = PowerUp::new(PowerUpKind::Star, Vec2Fixed::ZERO, 5);
        assert!(!p.is_blinking(2));
        assert!(!p.tick());
        assert!(!p.tick());
        assert!(!p.tick());
        assert!(p.is_blinking(2));
        assert!(!p.tick());
        assert!(p.tick());
    }

    #[test]
    fn test_egg_lifetime() {
        let mut egg = EasterEgg::new(Vec2Fixed::ZERO, 2);
        assert!(!egg.tick());
        assert!(egg.tick());
        assert_eq!(egg.remaining(), 0);
    }
}
