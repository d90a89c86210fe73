//! Event stream and presentation snapshot.
//!
//! Each tick produces a [`TickReport`]: the events raised in order, the
//! level status, and a [`Snapshot`] of everything a renderer draws.

use serde::{Deserialize, Serialize};

use crate::components::{BulletSide, Direction, EnemyType, EntityId, PowerUpKind, TankKind};
use crate::math::Vec2Fixed;
use crate::tile_map::{Cell, TileType};

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An enemy entered the field.
    EnemySpawned {
        /// New tank.
        id: EntityId,
        /// Its type.
        kind: EnemyType,
        /// Where it appeared.
        position: Vec2Fixed,
    },
    /// An enemy was destroyed by the player.
    EnemyKilled {
        /// Removed tank.
        id: EntityId,
        /// Its type.
        kind: EnemyType,
        /// Points awarded.
        score: u32,
    },
    /// An enemy survived a hit.
    EnemyHit {
        /// Hit tank.
        id: EntityId,
        /// Health left.
        health: u32,
    },
    /// The player lost health without dying.
    PlayerHit {
        /// Health left.
        health: u32,
    },
    /// The player lost a life.
    PlayerDied {
        /// Lives left afterwards.
        lives: u32,
    },
    /// The player reappeared.
    PlayerRespawned {
        /// Respawn point.
        position: Vec2Fixed,
    },
    /// The base fell.
    BaseDestroyed,
    /// Every enemy of the level is gone.
    LevelComplete {
        /// Cleared level.
        level: u32,
        /// Score so far.
        score: u64,
    },
    /// The session is over.
    GameOver {
        /// Level it ended on.
        level: u32,
        /// Final score.
        score: u64,
    },
    /// The UFO appeared.
    UfoIncoming {
        /// Entry point.
        position: Vec2Fixed,
    },
    /// The UFO was shot down.
    UfoDestroyed {
        /// Where it fell.
        position: Vec2Fixed,
    },
    /// The UFO left unharmed.
    UfoEscaped,
    /// The easter egg dropped.
    EasterEggSpawned {
        /// Where it lies.
        position: Vec2Fixed,
    },
    /// Someone took the easter egg.
    EasterEggCollected {
        /// True if the player took it.
        by_player: bool,
    },
    /// A power-up appeared.
    PowerUpSpawned {
        /// New power-up.
        id: EntityId,
        /// Its effect.
        kind: PowerUpKind,
        /// Where it lies.
        position: Vec2Fixed,
    },
    /// A tank picked up a power-up.
    PowerUpCollected {
        /// Removed power-up.
        id: EntityId,
        /// Its effect.
        kind: PowerUpKind,
        /// True if the player took it.
        by_player: bool,
    },
    /// A power-up ran out of time.
    PowerUpExpired {
        /// Removed power-up.
        id: EntityId,
    },
    /// The base footprint changed material.
    BaseProtectionChanged {
        /// New material of all five cells.
        tile: TileType,
    },
    /// One tile changed.
    TileChanged {
        /// Changed cell.
        cell: Cell,
        /// New tile.
        tile: TileType,
    },
    /// A shell left a barrel (or the UFO).
    BulletFired {
        /// New bullet.
        id: EntityId,
        /// Who fired.
        side: BulletSide,
    },
}

/// Why a level was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    /// A shell reached the base.
    BaseDestroyed,
    /// The player ran out of lives.
    OutOfLives,
}

/// Where the level stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LevelStatus {
    /// Still going.
    #[default]
    Playing,
    /// All enemies cleared.
    Won,
    /// Level (and session) lost.
    Lost(LossReason),
}

impl LevelStatus {
    /// True once the level is decided.
    #[must_use]
    pub const fn is_over(self) -> bool {
        !matches!(self, Self::Playing)
    }
}

/// A tank as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankView {
    /// Tank ID.
    pub id: EntityId,
    /// Player or enemy type.
    pub kind: TankKind,
    /// Center.
    pub position: Vec2Fixed,
    /// Heading.
    pub facing: Direction,
    /// Health left.
    pub health: u32,
    /// Shield up.
    pub shielded: bool,
    /// Frozen by a pickup.
    pub frozen: bool,
    /// False while waiting to respawn.
    pub visible: bool,
}

/// A bullet as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletView {
    /// Bullet ID.
    pub id: EntityId,
    /// Center.
    pub position: Vec2Fixed,
    /// Travel direction.
    pub direction: Direction,
    /// Who fired.
    pub side: BulletSide,
}

/// A power-up as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUpView {
    /// Power-up ID.
    pub id: EntityId,
    /// Effect.
    pub kind: PowerUpKind,
    /// Center.
    pub position: Vec2Fixed,
    /// In its final blinking window.
    pub blinking: bool,
}

/// The UFO as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UfoView {
    /// Center.
    pub position: Vec2Fixed,
    /// Hits left.
    pub health: u32,
}

/// The base as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseView {
    /// Center.
    pub position: Vec2Fixed,
    /// Destroyed flag.
    pub destroyed: bool,
}

/// Heads-up display numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Hud {
    /// Enemies still to come or alive in reserve.
    pub remaining_enemies: u32,
    /// Player lives.
    pub lives: u32,
    /// Current level.
    pub level: u32,
    /// Session score.
    pub score: u64,
}

/// Everything a renderer draws for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// All tanks, player first.
    pub tanks: Vec<TankView>,
    /// Bullets in flight.
    pub bullets: Vec<BulletView>,
    /// Power-ups on the field.
    pub power_ups: Vec<PowerUpView>,
    /// The UFO, if airborne.
    pub ufo: Option<UfoView>,
    /// The easter egg, if on the field.
    pub easter_egg: Option<Vec2Fixed>,
    /// The base.
    pub base: BaseView,
    /// HUD numbers.
    pub hud: Hud,
}

/// Output of one simulation tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick number after this update.
    pub tick: u64,
    /// Events in the order they happened.
    pub events: Vec<GameEvent>,
    /// Level status after this tick.
    pub status: LevelStatus,
    /// State for presentation.
    pub snapshot: Snapshot,
}
