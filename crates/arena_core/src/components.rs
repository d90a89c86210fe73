//! Shared value types used across the simulation.
//!
//! These are plain data tags with no behavior beyond small conversions.
//! Per-type tuning numbers live in [`crate::tuning`], not here.

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};

/// Unique identifier for entities.
pub type EntityId = u64;

/// One of the four axis-aligned headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    /// Toward row 0 (+Y in world space).
    #[default]
    Up,
    /// Toward the base (-Y in world space).
    Down,
    /// -X.
    Left,
    /// +X.
    Right,
}

impl Direction {
    /// All headings in a fixed order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Unit step in world space.
    #[must_use]
    pub fn unit(self) -> Vec2Fixed {
        let one = Fixed::ONE;
        match self {
            Self::Up => Vec2Fixed::new(Fixed::ZERO, one),
            Self::Down => Vec2Fixed::new(Fixed::ZERO, -one),
            Self::Left => Vec2Fixed::new(-one, Fixed::ZERO),
            Self::Right => Vec2Fixed::new(one, Fixed::ZERO),
        }
    }

    /// The opposite heading.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// True for Up/Down.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

/// Enemy tank classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
pub enum EnemyType {
    /// Basic tank.
    #[default]
    Regular,
    /// Quick, fragile.
    Fast,
    /// Two hits.
    Armored,
    /// Drops a power-up every time it is hit.
    Power,
    /// Slow, four hits, steel-breaking shells.
    Heavy,
    /// End-of-cycle boss.
    Boss,
}

impl EnemyType {
    /// All enemy types in table order.
    pub const ALL: [Self; 6] = [
        Self::Regular,
        Self::Fast,
        Self::Armored,
        Self::Power,
        Self::Heavy,
        Self::Boss,
    ];

    /// Types that the extra-enemy queue may produce.
    pub const EXTRA_POOL: [Self; 4] = [Self::Regular, Self::Fast, Self::Armored, Self::Power];

    /// Position of this type in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Regular => 0,
            Self::Fast => 1,
            Self::Armored => 2,
            Self::Power => 3,
            Self::Heavy => 4,
            Self::Boss => 5,
        }
    }

    /// Next rung of the shield-pickup upgrade ladder, `None` if this type
    /// only heals.
    #[must_use]
    pub const fn upgrade(self) -> Option<Self> {
        match self {
            Self::Regular | Self::Fast => Some(Self::Armored),
            Self::Armored => Some(Self::Heavy),
            Self::Power | Self::Heavy | Self::Boss => None,
        }
    }
}

/// Who a tank belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TankKind {
    /// Human player with a 1-based player number.
    Player(u8),
    /// AI-controlled enemy.
    Enemy(EnemyType),
}

/// The eleven collectible power-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Steel-breaking shells.
    Gun,
    /// Faster shells; stacks.
    Star,
    /// Movement speed.
    Car,
    /// Cross water.
    Ship,
    /// Base fortification.
    Shovel,
    /// Cut through forest.
    Saw,
    /// Extra life / extra enemy.
    Tank,
    /// Invulnerability or upgrade.
    Shield,
    /// More bullets in flight; stacks.
    Machinegun,
    /// Freeze the other side.
    Freeze,
    /// Destroy the other side.
    Bomb,
}

impl PowerUpKind {
    /// All kinds, used for the uniform type roll.
    pub const ALL: [Self; 11] = [
        Self::Gun,
        Self::Star,
        Self::Car,
        Self::Ship,
        Self::Shovel,
        Self::Saw,
        Self::Tank,
        Self::Shield,
        Self::Machinegun,
        Self::Freeze,
        Self::Bomb,
    ];
}

/// Which side fired a bullet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BulletSide {
    /// Fired by the player.
    Player,
    /// Fired by an enemy tank.
    Enemy,
    /// Fired by the UFO.
    Ufo,
}

impl BulletSide {
    /// True for shots that can hurt the player.
    #[must_use]
    pub const fn is_hostile(self) -> bool {
        matches!(self, Self::Enemy | Self::Ufo)
    }
}
