//! Bar-replay backtesting: candle loading, fill simulation, the replay
//! loop, and scoring. The live engine reuses [`engine::run`] for its
//! shadow parity replays.

pub mod data;
pub mod engine;
pub mod fills;
pub mod metrics;

pub use data::{load_bars, write_history};
pub use engine::{run, BacktestReport};
pub use fills::{simulate, SimulatedFills};
pub use metrics::{score, MinMaxStats};
