//! Logging, log sinks, and timing helpers

mod log_sink;
mod logger;
mod timer;

pub use log_sink::{FileLogSinkFactory, LogSink, LogSinkFactory};
pub use logger::{init_logger, resolve_level};
pub use timer::{RoundClock, Timer};
