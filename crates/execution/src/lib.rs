//! Order reconciliation and placement: turns desired leg books into the
//! minimal cancel/place sequence and pushes it to an exchange.

pub mod placer;
pub mod reconcile;

pub use placer::apply_plan;
pub use reconcile::{aggregate_legs, reconcile, Action, Tolerances};
