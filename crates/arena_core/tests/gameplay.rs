//! Whole-level gameplay tests.
//!
//! These drive full simulations through the public API the way the
//! headless runner does, rather than poking at single systems.

use arena_core::components::{BulletSide, Direction, PowerUpKind};
use arena_core::entities::{Bullet, BULLET_SPEED};
use arena_core::events::{GameEvent, LevelStatus, LossReason};
use arena_core::map_generation::MAX_EMPTY_FRACTION;
use arena_core::session::{Session, SessionPhase};
use arena_core::simulation::{LevelSetup, PlayerInput, Simulation};
use arena_core::tile_map::{
    in_spawn_area, interior_empty_fraction, Cell, TileMap, TileType, BASE_CELL, MAP_COLS,
    MAP_ROWS, PROTECTION_CELLS,
};
use arena_core::tuning::Tuning;
use arena_test_utils::determinism::strategies::{arb_enemy_type, arb_power_up, arb_seed};
use arena_test_utils::fixtures::{generated_level, open_arena, patrol_inputs, HOLD_SPAWNS};
use proptest::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

fn assert_map_invariants(map: &TileMap) {
    for row in 0..MAP_ROWS as i32 {
        for col in 0..MAP_COLS as i32 {
            let cell = Cell::new(row, col);
            let tile = map.get_tile(cell);
            if cell.is_border() {
                assert_eq!(tile, TileType::Steel, "border at {cell:?}");
            } else if in_spawn_area(cell) {
                assert_eq!(tile, TileType::Empty, "spawn area at {cell:?}");
            }
        }
    }
    assert_eq!(map.get_tile(BASE_CELL), TileType::Empty);
    for cell in PROTECTION_CELLS {
        assert_eq!(map.get_tile(cell), TileType::Brick, "footprint at {cell:?}");
    }
    assert!(interior_empty_fraction(map.tiles()) <= MAX_EMPTY_FRACTION);
}

/// Tuning for a one-enemy level.
fn single_enemy_tuning() -> Tuning {
    let mut tuning = Tuning::default();
    tuning.spawner.base_total = 1;
    tuning.spawner.total_per_level = 0;
    tuning
}

// =============================================================================
// Map generation
// =============================================================================

#[test]
fn test_seed_42_level_1_layout() {
    let sim = generated_level(1, 42);
    assert_map_invariants(sim.map());
    let stats = sim.map().generation_stats().expect("generated maps carry stats");
    assert!(stats.structures > 0);
}

#[test]
fn test_levels_get_distinct_maps() {
    let one = generated_level(1, 42);
    let two = generated_level(2, 42);
    assert_ne!(one.map().tiles(), two.map().tiles());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_generated_maps_hold_invariants(seed in arb_seed()) {
        assert_map_invariants(&TileMap::generate(seed));
    }
}

// =============================================================================
// Caps and bounds
// =============================================================================

#[test]
fn test_on_screen_cap_holds_for_whole_level() {
    let mut sim = generated_level(1, 9);
    let cap = sim.spawner().max_on_screen();
    for _ in 0..3000 {
        sim.tick(PlayerInput::default());
        assert!(sim.living_enemies() <= cap);
        assert!(sim.spawner().spawned() <= sim.spawner().total_enemies());
    }
}

#[test]
fn test_player_bullet_cap() {
    let mut sim = open_arena(12);
    for _ in 0..600 {
        sim.tick(PlayerInput::fire());
        let Some(player) = sim.player() else {
            panic!("player tank missing");
        };
        let in_flight = sim
            .bullets()
            .values()
            .filter(|b| b.side == BulletSide::Player)
            .count() as u32;
        assert!(in_flight <= player.max_bullets());
        assert_eq!(in_flight, player.bullets_in_flight);
    }
}

#[test]
fn test_hud_tracks_spawns() {
    let mut sim = generated_level(3, 5);
    let total = sim.spawner().total_enemies();
    assert_eq!(sim.hud().remaining_enemies, total);
    for _ in 0..400 {
        sim.tick(PlayerInput::default());
    }
    let hud = sim.hud();
    assert_eq!(hud.level, 3);
    assert!(hud.remaining_enemies <= total);
}

// =============================================================================
// Pickups
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Any enemy type drives onto any power-up: it is taken once, by the
    /// enemy, and only a tank pickup grows the remaining count.
    #[test]
    fn prop_enemy_takes_any_power_up(
        seed in arb_seed(),
        enemy in arb_enemy_type(),
        kind in arb_power_up(),
    ) {
        let mut sim = open_arena(seed);
        let at = Cell::new(6, 12).center();
        sim.spawn_enemy(enemy, at);
        let id = sim.place_power_up(kind, at);
        let before = sim.hud().remaining_enemies;

        let report = sim.tick(PlayerInput::default());
        let expected = GameEvent::PowerUpCollected {
            id,
            kind,
            by_player: false,
        };
        prop_assert!(report.events.contains(&expected));
        prop_assert!(sim.power_ups().is_empty());
        let extra = u32::from(kind == PowerUpKind::Tank);
        prop_assert_eq!(sim.hud().remaining_enemies, before + extra);
        prop_assert!(sim.player().is_some_and(|p| p.alive));
        prop_assert_eq!(sim.living_enemies(), 1);
    }
}

// =============================================================================
// Winning and losing
// =============================================================================

#[test]
fn test_bomb_clears_last_enemy_and_wins() {
    let mut sim = Simulation::with_map(
        LevelSetup::new(1, 31),
        single_enemy_tuning(),
        TileMap::bordered(),
    )
    .unwrap();

    for _ in 0..600 {
        sim.tick(PlayerInput::default());
        if sim.living_enemies() == 1 {
            break;
        }
    }
    assert_eq!(sim.living_enemies(), 1);
    assert!(sim.spawner().exhausted());

    let at = sim.player().unwrap().position;
    sim.place_power_up(PowerUpKind::Bomb, at);
    let report = sim.tick(PlayerInput::default());

    assert_eq!(report.status, LevelStatus::Won);
    assert!(report
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::LevelComplete { level: 1, .. })));

    // A finished level ignores further input.
    let frozen = sim.state_hash();
    let after = sim.tick(PlayerInput::fire());
    assert!(after.events.is_empty());
    assert_eq!(sim.state_hash(), frozen);
}

#[test]
fn test_session_carries_score_into_next_level() {
    let mut session = Session::new(8, 1, single_enemy_tuning()).unwrap();
    for _ in 0..600 {
        session.tick(PlayerInput::default()).unwrap();
        if session.simulation().living_enemies() == 1 {
            break;
        }
    }
    assert_eq!(session.simulation().living_enemies(), 1);

    let sim = session.simulation_mut();
    let at = sim.player().unwrap().position;
    sim.place_power_up(PowerUpKind::Bomb, at);
    let report = session.tick(PlayerInput::default()).unwrap();
    assert_eq!(report.status, LevelStatus::Won);

    let score = match report.events.iter().find_map(|e| match e {
        GameEvent::LevelComplete { score, .. } => Some(*score),
        _ => None,
    }) {
        Some(score) => score,
        None => panic!("no LevelComplete event"),
    };
    assert!(score > 0);
    assert_eq!(session.level(), 2);
    assert_eq!(session.levels_cleared(), 1);
    assert_eq!(session.phase(), SessionPhase::Playing);
    assert_eq!(session.simulation().score(), score);
    assert_eq!(session.simulation().current_tick(), 0);
}

#[test]
fn test_base_hit_ends_session_and_freezes() {
    let mut session = Session::new(2, 1, Tuning::default()).unwrap();
    let above = Cell::new(BASE_CELL.row - 2, BASE_CELL.col);
    {
        let sim = session.simulation_mut();
        sim.spawner_mut().hold(HOLD_SPAWNS);
        sim.map_mut().clear_base_protection();
        sim.map_mut().set_tile(above, TileType::Empty);
        sim.spawn_bullet(Bullet::new(
            above.center(),
            Direction::Down,
            None,
            BulletSide::Enemy,
            1,
            BULLET_SPEED,
        ));
    }

    let mut lost_at = None;
    for _ in 0..20 {
        let report = session.tick(PlayerInput::default()).unwrap();
        if report.status == LevelStatus::Lost(LossReason::BaseDestroyed) {
            lost_at = Some(report.tick);
            break;
        }
    }
    assert!(lost_at.is_some_and(|t| t <= 10), "base survived: {lost_at:?}");
    assert_eq!(
        session.phase(),
        SessionPhase::GameOver { level: 1, score: 0 }
    );
    assert_eq!(session.levels_cleared(), 0);

    let frozen = session.state_hash();
    session.tick(PlayerInput::fire()).unwrap();
    session.tick(PlayerInput::drive(Direction::Up)).unwrap();
    assert_eq!(session.state_hash(), frozen);
}

#[test]
fn test_patrol_session_replays_identically() {
    let tape = patrol_inputs(2400);
    let run = || {
        let mut session = Session::new(64, 2, Tuning::default()).unwrap();
        for input in &tape {
            session.tick(*input).unwrap();
        }
        session.state_hash()
    };
    assert_eq!(run(), run());
}
