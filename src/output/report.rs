//! Per-URL outcomes and the aggregate run report

use crate::output::SinkReport;
use crate::probe::{FailureKind, FetchFailure};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Result of checking one valid URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page fetched and contains the keyword
    Matched(String),

    /// Page fetched but does not contain the keyword
    NotMatched,

    /// Page could not be fetched
    Failed(String, FetchFailure),
}

/// Aggregate result of a pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Destination the matches were appended to
    pub output_path: PathBuf,

    /// Non-blank input lines
    pub candidates: usize,

    /// Lines that passed URL validation
    pub valid: usize,

    /// Lines rejected by URL validation
    pub invalid: usize,

    /// Matched URLs in input order
    pub matched: Vec<String>,

    pub not_matched: usize,

    /// Failed URLs in input order
    pub failed: Vec<(String, FetchFailure)>,

    /// Valid URLs never started because the run was cancelled
    pub not_attempted: usize,

    /// The run was cancelled before every URL was checked
    pub interrupted: bool,

    pub sink: SinkReport,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, output_path: PathBuf) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            output_path,
            candidates: 0,
            valid: 0,
            invalid: 0,
            matched: Vec::new(),
            not_matched: 0,
            failed: Vec::new(),
            not_attempted: 0,
            interrupted: false,
            sink: SinkReport::default(),
        }
    }

    /// Adds one outcome to the tallies
    pub fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Matched(url) => self.matched.push(url),
            FetchOutcome::NotMatched => self.not_matched += 1,
            FetchOutcome::Failed(url, failure) => self.failed.push((url, failure)),
        }
    }

    /// Number of URLs that produced an outcome
    pub fn checked(&self) -> usize {
        self.matched.len() + self.not_matched + self.failed.len()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn failures_by_kind(&self) -> BTreeMap<FailureKind, usize> {
        let mut counts = BTreeMap::new();
        for (_, failure) in &self.failed {
            *counts.entry(failure.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Emits the one-line run summary through tracing
    pub fn log_summary(&self) {
        tracing::info!(
            "Checked {} of {} valid URLs: {} matched, {} not matched, {} failed, {} not attempted; saved {} to {}",
            self.checked(),
            self.valid,
            self.matched.len(),
            self.not_matched,
            self.failed.len(),
            self.not_attempted,
            self.sink.written,
            self.output_path.display()
        );
        if self.sink.failed > 0 {
            tracing::error!("{} matches could not be written", self.sink.failed);
        }
    }
}

/// Prints the run report to stdout in a formatted manner
pub fn print_report(report: &RunReport) {
    println!("=== Keyword Probe Summary ===\n");

    println!("Input:");
    println!("  Candidate lines: {}", report.candidates);
    println!("  Valid URLs: {}", report.valid);
    println!("  Invalid lines skipped: {}", report.invalid);
    println!();

    println!("Results:");
    println!("  Matched: {}", report.matched.len());
    println!("  Not matched: {}", report.not_matched);
    println!("  Failed: {}", report.failed.len());
    if report.not_attempted > 0 {
        println!("  Not attempted (interrupted): {}", report.not_attempted);
    }
    println!();

    let by_kind = report.failures_by_kind();
    if !by_kind.is_empty() {
        println!("Failures by Kind:");
        for (kind, count) in by_kind {
            println!("  {:?}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Saved {} URLs to {} in {:.1}s",
        report.sink.written,
        report.output_path.display(),
        report.duration().num_milliseconds() as f64 / 1000.0
    );
    if report.sink.failed > 0 {
        println!("  {} matches could not be written", report.sink.failed);
    }
}
