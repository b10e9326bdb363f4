//! Output module for persisting matches and reporting run results
//!
//! This module handles:
//! - The single-writer result sink that appends matched URLs as they arrive
//! - Per-URL outcomes and the aggregate run report
//! - Printing a human-readable summary at the end of a run

mod report;
mod sink;

pub use report::{print_report, FetchOutcome, RunReport};
pub use sink::{ResultSink, SinkError, SinkReport, SinkWriter};
