//! Live trading: the streaming engine that runs a strategy against a
//! real exchange using the same accounting as the backtester.

pub mod engine;

pub use engine::LiveEngine;
