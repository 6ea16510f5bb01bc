//! Report sinks for matrix runs

mod report;

pub use report::{name_with_timestamp, ReportSink, SuiteReport};
