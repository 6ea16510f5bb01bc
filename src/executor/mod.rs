//! Matrix execution engine
//!
//! Bounded worker pool, round dispatch with retry-by-outcome, and a
//! thread-safe interrupt.

mod command;
mod matrix;
mod pool;
mod round;
mod unit;

pub use command::CommandUnitFactory;
pub use matrix::MatrixRunner;
