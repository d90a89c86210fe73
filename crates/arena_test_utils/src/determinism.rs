//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A level must replay bit-for-bit from its session seed and input tape.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Positions and speeds use
//!   [`arena_core::math::Fixed`]; floats only appear in probability rolls
//!   drawn from the seeded stream.
//!
//! - **HashMap iteration order**: Entity storage is a `BTreeMap`, so every
//!   pass visits entities in creation order.
//!
//! - **System randomness**: Every roll comes from the per-level
//!   [`arena_core::rng::SeededRandom`].
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual subsystems (generator, AI, spawner)
//! 2. **Property tests**: Random seeds and input tapes still reproduce
//! 3. **Integration tests**: Whole sessions are reproducible
//! 4. **Parallel tests**: Running N simulations on threads all match

use std::thread;

use arena_core::simulation::{PlayerInput, Simulation};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick; gets the tick index
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for tick in 0..ticks {
            step(&mut state, tick);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Input for tick `tick` of a tape; idle once the tape runs out.
fn input_at(tape: &[PlayerInput], tick: u64) -> PlayerInput {
    tape.get(tick as usize).copied().unwrap_or_default()
}

/// Run a simulation twice over the same input tape and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, tape: &[PlayerInput]) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        tape.len() as u64,
        &setup_fn,
        |sim, tick| {
            sim.tick(input_at(tape, tick));
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N simulations on scoped threads over the same tape.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(
    setup_fn: F,
    num_sims: usize,
    tape: &[PlayerInput],
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for input in tape {
                        sim.tick(*input);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: tape.len() as u64,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, tape: &[PlayerInput]) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for (tick, input) in tape.iter().enumerate() {
        sim1.tick(*input);
        sim2.tick(*input);

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick = tick + 1, "Simulations diverged");
            return Some(tick as u64 + 1);
        }
    }

    None
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use arena_core::components::{Direction, EnemyType, PowerUpKind};
    use arena_core::simulation::PlayerInput;
    use proptest::prelude::*;

    /// Any of the four headings.
    pub fn arb_direction() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::ALL.to_vec())
    }

    /// Any enemy type.
    pub fn arb_enemy_type() -> impl Strategy<Value = EnemyType> {
        prop::sample::select(EnemyType::ALL.to_vec())
    }

    /// Any power-up kind.
    pub fn arb_power_up() -> impl Strategy<Value = PowerUpKind> {
        prop::sample::select(PowerUpKind::ALL.to_vec())
    }

    /// One tick of player input, idle about a quarter of the time.
    pub fn arb_input() -> impl Strategy<Value = PlayerInput> {
        (proptest::option::weighted(0.75, arb_direction()), any::<bool>())
            .prop_map(|(movement, fire)| PlayerInput { movement, fire })
    }

    /// Held inputs: each entry repeats for 1 to 40 ticks.
    ///
    /// Real players hold a direction for a while; per-tick noise would keep
    /// the tank twitching in place.
    pub fn arb_input_tape(max_segments: usize) -> impl Strategy<Value = Vec<PlayerInput>> {
        proptest::collection::vec((arb_input(), 1usize..40), 1..max_segments).prop_map(
            |segments| {
                segments
                    .into_iter()
                    .flat_map(|(input, len)| std::iter::repeat(input).take(len))
                    .collect()
            },
        )
    }

    /// Session seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Level number, boss levels included.
    pub fn arb_level() -> impl Strategy<Value = u32> {
        1u32..=15
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{generated_level, open_arena, patrol_inputs};
    use arena_core::components::{Direction, EnemyType};
    use arena_core::tile_map::Cell;
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n, _| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_idle_level_determinism() {
        let tape = vec![PlayerInput::default(); 600];
        assert!(verify_simulation_determinism(|| generated_level(1, 5), &tape));
    }

    #[test]
    fn test_patrol_determinism() {
        assert!(verify_simulation_determinism(
            || generated_level(4, 1234),
            &patrol_inputs(1200)
        ));
    }

    #[test]
    fn test_combat_scenario_determinism() {
        let setup = || {
            let mut sim = open_arena(9);
            for col in [3, 8, 13, 18] {
                sim.spawn_enemy(EnemyType::Fast, Cell::new(3, col).center());
            }
            sim
        };
        assert_eq!(find_first_divergence(setup, &patrol_inputs(900)), None);
    }

    #[test]
    fn test_parallel_levels_match() {
        let result = run_parallel_simulations(|| generated_level(5, 77), 4, &patrol_inputs(600));
        result.assert_deterministic();
    }

    #[test]
    fn test_different_inputs_diverge() {
        let mut a = generated_level(1, 3);
        let mut b = generated_level(1, 3);
        for _ in 0..60 {
            a.tick(PlayerInput::drive(Direction::Up));
            b.tick(PlayerInput::drive(Direction::Left));
        }
        assert_ne!(a.state_hash(), b.state_hash());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Any seed, level and input tape reproduces exactly.
        #[test]
        fn prop_levels_are_deterministic(
            seed in arb_seed(),
            level in arb_level(),
            tape in arb_input_tape(20),
        ) {
            prop_assert!(verify_simulation_determinism(|| generated_level(level, seed), &tape));
        }

        /// Generated maps depend on the seed alone.
        #[test]
        fn prop_map_generation_is_pure(seed in arb_seed()) {
            let a = arena_core::tile_map::TileMap::generate(seed);
            let b = arena_core::tile_map::TileMap::generate(seed);
            prop_assert_eq!(a.tiles(), b.tiles());
        }
    }
}
