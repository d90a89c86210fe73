//! Headless arena runner for CI, balance sweeps and replay verification.
//!
//! Everything here drives [`arena_core`] without a renderer:
//!
//! - **Map dumps**: Generate a level and print it as ASCII
//! - **Autoplay**: Scripted pilots play whole sessions
//! - **Batch runs**: Many seeds in parallel, summarized as JSON
//! - **Verification**: Determinism checks and replay desync detection
//!
//! # Example
//!
//! ```bash
//! # Print level 3 of session 42
//! cargo run -p arena_headless -- generate --seed 42 --level 3
//!
//! # 200 hunter sessions, results in results/batch.json
//! cargo run -p arena_headless -- batch --count 200 --output results/
//!
//! # Check a recorded replay
//! cargo run -p arena_headless -- replay --input run.replay --verify
//! ```

pub mod ascii_visualizer;
pub mod batch;
pub mod error;
pub mod game_runner;
pub mod metrics;
pub mod pilot;

pub use ascii_visualizer::{render_ascii, AsciiConfig};
pub use batch::{run_batch, BatchConfig, BatchResults};
pub use error::RunnerError;
pub use game_runner::{run_game, run_recorded_game, GameConfig};
pub use metrics::{BatchSummary, GameMetrics, MetricsCollector, Outcome};
pub use pilot::{Pilot, PilotKind};
