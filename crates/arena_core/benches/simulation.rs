//! Simulation benchmarks for arena_core.
//!
//! Run with: `cargo bench -p arena_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use arena_core::components::Direction;
use arena_core::simulation::{LevelSetup, PlayerInput, Simulation};
use arena_core::tile_map::TileMap;
use arena_core::tuning::Tuning;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn scripted_input(tick: u32) -> PlayerInput {
    PlayerInput {
        movement: Some(Direction::ALL[(tick / 30 % 4) as usize]),
        fire: tick % 4 == 0,
    }
}

/// Map generation, including density repair.
pub fn generation_benchmark(c: &mut Criterion) {
    let mut seed = 0u64;
    c.bench_function("generate_map", |b| {
        b.iter(|| {
            seed = seed.wrapping_add(1);
            black_box(TileMap::generate(black_box(seed)))
        });
    });
}

/// One second of play on a generated level.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("simulate_60_ticks", |b| {
        b.iter_batched(
            || Simulation::new(LevelSetup::new(3, 42), Tuning::default()).unwrap(),
            |mut sim| {
                for tick in 0..60 {
                    black_box(sim.tick(scripted_input(tick)));
                }
                sim
            },
            BatchSize::SmallInput,
        );
    });

    let mut sim = Simulation::new(LevelSetup::new(3, 42), Tuning::default()).unwrap();
    for tick in 0..600 {
        sim.tick(scripted_input(tick));
    }
    c.bench_function("state_hash", |b| b.iter(|| black_box(sim.state_hash())));
}

criterion_group!(benches, generation_benchmark, simulation_benchmark);
criterion_main!(benches);
