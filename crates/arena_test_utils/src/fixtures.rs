//! Test fixtures and helpers.
//!
//! Pre-built arenas and input tapes for consistent testing.

use arena_core::components::Direction;
use arena_core::simulation::{LevelSetup, PlayerInput, Simulation};
use arena_core::tile_map::TileMap;
use arena_core::tuning::Tuning;

/// Ticks enough to hold the spawner for any test.
pub const HOLD_SPAWNS: u32 = 1_000_000;

/// Level 1 on an empty bordered map with spawning suspended.
///
/// Tests place enemies, bullets and power-ups by hand.
#[must_use]
pub fn open_arena(seed: u64) -> Simulation {
    let mut sim = Simulation::with_map(
        LevelSetup::new(1, seed),
        Tuning::default(),
        TileMap::bordered(),
    )
    .expect("bordered map and default tuning are valid");
    sim.spawner_mut().hold(HOLD_SPAWNS);
    sim
}

/// A freshly generated level.
#[must_use]
pub fn generated_level(level: u32, session_seed: u64) -> Simulation {
    Simulation::new(LevelSetup::new(level, session_seed), Tuning::default())
        .expect("default tuning is valid for any level above 0")
}

/// A deterministic input tape that sweeps all four directions and fires
/// every few ticks.
#[must_use]
pub fn patrol_inputs(ticks: usize) -> Vec<PlayerInput> {
    (0..ticks)
        .map(|t| PlayerInput {
            movement: Some(Direction::ALL[t / 45 % 4]),
            fire: t % 6 == 0,
        })
        .collect()
}

/// A 26-row map from ASCII rows with the protection footprint and a single
/// interior `fill` row.
///
/// Handy for scenario maps: everything but `row` is empty interior.
#[must_use]
pub fn map_with_row(row: usize, fill: &str) -> TileMap {
    let mut rows: Vec<String> = TileMap::bordered()
        .to_ascii()
        .lines()
        .map(str::to_owned)
        .collect();
    if let Some(target) = rows.get_mut(row) {
        let interior: String = fill.chars().take(24).collect();
        let padded = format!("S{interior:.<24}S");
        *target = padded;
    }
    TileMap::from_rows(&rows).expect("fixture rows keep the border and footprint")
}
