//! # Arena Core
//!
//! Deterministic simulation core for a tile-based tank arena.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No audio playback (cues go through [`services::AudioSink`])
//! - No system randomness (every roll comes from a seeded stream)
//! - No floating-point positions (uses fixed-point)
//!
//! This separation enables:
//! - Reproducible levels from a single session seed
//! - Headless batch runs and balance sweeps
//! - Replay files verified by state hash
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`tile_map`] / [`map_generation`] - Terrain grid and its seeded generator
//! - [`entities`] - Tank, bullet, power-up, UFO, easter egg and base models
//! - [`ai`] - Enemy decision making
//! - [`spawner`] - Enemy population control
//! - [`simulation`] - Per-level tick pipeline and collision resolution
//! - [`session`] - Level chaining and carried player state
//! - [`replay`] - Input recording and verified playback
//! - [`hashing`] - Toolchain-stable state hashes
//! - [`tuning`] - Gameplay constants, loadable from RON
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod components;
pub mod entities;
pub mod error;
pub mod events;
pub mod hashing;
pub mod map_generation;
pub mod math;
pub mod replay;
pub mod rng;
pub mod services;
pub mod session;
pub mod simulation;
pub mod spawner;
pub mod storage;
pub mod timers;
pub mod tile_map;
pub mod tuning;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::entities::{Base, Bullet, EasterEgg, PowerUp, Tank, Ufo};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{GameEvent, Hud, LevelStatus, LossReason, Snapshot, TickReport};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::{Replay, ReplayPlayer, ReplayRecorder};
    pub use crate::rng::SeededRandom;
    pub use crate::services::{AudioSink, NullAudio, SoundCue};
    pub use crate::session::{CarryOver, Session, SessionPhase};
    pub use crate::simulation::{LevelSetup, PlayerInput, Simulation};
    pub use crate::tile_map::{Cell, TileMap, TileType};
    pub use crate::tuning::Tuning;
}
