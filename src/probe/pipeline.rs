//! Pipeline orchestrator - concurrent fetch/filter/persist
//!
//! This module drives a single run:
//! - Reading and validating the candidate list
//! - Starting the result sink (which truncates the output file)
//! - Running one fetch unit per valid URL under a concurrency bound
//! - Stopping the sink once every unit has finished, so all matches are flushed
//! - Assembling the run report

use crate::config::PipelineConfig;
use crate::output::{FetchOutcome, ResultSink, RunReport, SinkWriter};
use crate::probe::{fetch_with_retry, KeywordMatcher, PageFetcher, RetryPolicy};
use crate::state::PipelineState;
use crate::url::{partition_candidates, read_candidates};
use crate::ProbeError;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Orchestrates one keyword-probe run
pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    config: PipelineConfig,
    retry: RetryPolicy,
    cancel: CancellationToken,
    state: PipelineState,
}

/// Everything a fetch unit needs, cloned into its task
struct FetchUnit {
    fetcher: Arc<dyn PageFetcher>,
    matcher: Arc<KeywordMatcher>,
    sink: SinkWriter,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Creates a pipeline that fetches through `fetcher`
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: PipelineConfig) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            fetcher,
            config,
            retry,
            cancel: CancellationToken::new(),
            state: PipelineState::Idle,
        }
    }

    /// Uses an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run from starting further fetches when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the pipeline against an input file
    ///
    /// A missing or unreadable input file fails the run before the output
    /// file is touched.
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - Run completed; per-URL failures are in the report
    /// * `Err(ProbeError)` - Setup failed or the pipeline was already used
    pub async fn run(
        &mut self,
        input: &Path,
        output: &Path,
        keyword: &str,
    ) -> Result<RunReport, ProbeError> {
        self.ensure_idle()?;

        let lines = match read_candidates(input).await {
            Ok(lines) => lines,
            Err(e) => {
                self.transition(PipelineState::Failed)?;
                return Err(e);
            }
        };
        tracing::info!("Read {} URLs from {}", lines.len(), input.display());

        self.run_candidates(lines, output, keyword).await
    }

    /// Runs the pipeline against candidate lines already in memory
    ///
    /// Lines must be trimmed and non-empty.
    pub async fn run_candidates(
        &mut self,
        lines: Vec<String>,
        output: &Path,
        keyword: &str,
    ) -> Result<RunReport, ProbeError> {
        self.ensure_idle()?;
        let mut report = RunReport::new(Utc::now(), output.to_path_buf());

        self.transition(PipelineState::Validating)?;
        report.candidates = lines.len();
        let (urls, invalid) = partition_candidates(lines);
        report.valid = urls.len();
        report.invalid = invalid;
        tracing::info!(
            "Found {} valid URLs ({} invalid lines skipped)",
            urls.len(),
            invalid
        );

        let sink = match ResultSink::start(output).await {
            Ok(sink) => sink,
            Err(e) => {
                self.transition(PipelineState::Failed)?;
                return Err(e.into());
            }
        };
        self.transition(PipelineState::Running)?;

        let (outcomes, not_attempted) = self.fetch_all(&urls, keyword, &sink).await;

        self.transition(PipelineState::Draining)?;
        report.sink = match sink.stop().await {
            Ok(sink_report) => sink_report,
            Err(e) => {
                self.transition(PipelineState::Failed)?;
                return Err(e.into());
            }
        };
        self.transition(PipelineState::Done)?;

        for outcome in outcomes {
            report.record(outcome);
        }
        report.not_attempted = not_attempted;
        report.interrupted = self.cancel.is_cancelled();
        report.finished_at = Utc::now();

        tracing::info!(
            "{} of {} valid URLs contain '{}'",
            report.matched.len(),
            report.valid,
            keyword
        );

        Ok(report)
    }

    /// Runs a fetch unit for each URL, at most `max_concurrent_fetches` at once
    ///
    /// Returns outcomes in input order and the number of URLs never started
    /// because of cancellation. In-flight units always run to completion.
    async fn fetch_all(
        &self,
        urls: &[String],
        keyword: &str,
        sink: &ResultSink,
    ) -> (Vec<FetchOutcome>, usize) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_fetches.max(1)));
        let matcher = Arc::new(KeywordMatcher::new(keyword));
        let mut tasks = JoinSet::new();
        let mut launched = 0;

        for (index, url) in urls.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let unit = FetchUnit {
                fetcher: Arc::clone(&self.fetcher),
                matcher: Arc::clone(&matcher),
                sink: sink.writer(),
                retry: self.retry,
                cancel: self.cancel.clone(),
            };
            let url = url.clone();
            let span = tracing::info_span!("fetch", url = %url);

            tasks.spawn(
                async move {
                    let outcome = unit.run(&url).await;
                    drop(permit);
                    (index, outcome)
                }
                .instrument(span),
            );
            launched += 1;
        }

        let not_attempted = urls.len() - launched;
        if not_attempted > 0 {
            tracing::warn!(
                "Run cancelled: {} URLs will not be checked",
                not_attempted
            );
        }

        let mut outcomes = Vec::with_capacity(launched);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Fetch task ended abnormally: {}", e),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        (
            outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
            not_attempted,
        )
    }

    fn ensure_idle(&self) -> Result<(), ProbeError> {
        if self.state != PipelineState::Idle {
            return Err(ProbeError::InvalidTransition {
                from: self.state,
                to: PipelineState::Validating,
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: PipelineState) -> Result<(), ProbeError> {
        if !self.state.can_transition_to(next) {
            return Err(ProbeError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Pipeline {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

impl FetchUnit {
    /// fetch -> match -> enqueue, producing exactly one outcome
    async fn run(&self, url: &str) -> FetchOutcome {
        tracing::info!("Checking {}", url);

        match fetch_with_retry(self.fetcher.as_ref(), url, &self.retry, &self.cancel).await {
            Ok(body) => {
                if self.matcher.is_match(&body) {
                    tracing::info!("{} contains '{}'", url, self.matcher.keyword());
                    self.sink.write(url);
                    FetchOutcome::Matched(url.to_string())
                } else {
                    tracing::info!("{} does not contain '{}'", url, self.matcher.keyword());
                    FetchOutcome::NotMatched
                }
            }
            Err(failure) => {
                tracing::error!("Failed to check {}: {}", url, failure);
                FetchOutcome::Failed(url.to_string(), failure)
            }
        }
    }
}
