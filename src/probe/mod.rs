//! Probe module: fetching, matching, and orchestrating keyword checks
//!
//! This module contains the core pipeline, including:
//! - HTTP fetching with failure classification
//! - Case-insensitive keyword matching
//! - Bounded retry for transient failures
//! - The concurrent fetch/filter/persist orchestrator

mod fetcher;
mod matcher;
mod pipeline;
mod retry;

pub use fetcher::{build_http_client, FailureKind, FetchFailure, HttpFetcher, PageFetcher};
pub use matcher::{matches, KeywordMatcher};
pub use pipeline::Pipeline;
pub use retry::{fetch_with_retry, RetryPolicy};
