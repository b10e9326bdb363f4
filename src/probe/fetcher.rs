//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - Building a shared HTTP client with browser-like default headers
//! - GET requests with success-status enforcement
//! - Error classification into [`FetchFailure`] kinds

use crate::config::FetchConfig;
use crate::{ConfigError, ProbeError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Classified reason a single URL could not be checked
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// Connection, DNS, or TLS failure
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status
    #[error("HTTP status {status}: {detail}")]
    HttpStatus { status: u16, detail: String },

    /// The request or body read exceeded the timeout
    #[error("timed out: {0}")]
    Timeout(String),

    /// Anything else, including body read and decoding failures
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Kind of a [`FetchFailure`], without its detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    Network,
    HttpStatus,
    Timeout,
    Unknown,
}

impl FetchFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::HttpStatus { .. } => FailureKind::HttpStatus,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Unknown(_) => FailureKind::Unknown,
        }
    }

    /// Human-readable detail message
    pub fn detail(&self) -> &str {
        match self {
            Self::Network(detail)
            | Self::Timeout(detail)
            | Self::Unknown(detail)
            | Self::HttpStatus { detail, .. } => detail,
        }
    }

    /// Only transient transport failures are worth another attempt
    ///
    /// A non-2xx status is a stable answer from the server and is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

/// Capability to fetch a page body for a URL
///
/// Implementations must be safe to share between concurrent fetch units.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the decoded body of a 2xx response
    async fn fetch(&self, url: &str) -> Result<String, FetchFailure>;
}

/// [`PageFetcher`] backed by a shared reqwest connection pool
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher with a new client configured from `config`
    pub fn new(config: &FetchConfig) -> Result<Self, ProbeError> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::HttpStatus {
                status: status.as_u16(),
                detail: status.to_string(),
            });
        }

        response.text().await.map_err(classify_body_error)
    }
}

/// Builds an HTTP client with the configured headers and timeouts
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(ProbeError)` - A header value was invalid or the client failed to build
///
/// # Example
///
/// ```no_run
/// use keyword_probe::config::FetchConfig;
/// use keyword_probe::probe::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, ProbeError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, header_value("accept", &config.accept)?);
    headers.insert(
        ACCEPT_LANGUAGE,
        header_value("accept-language", &config.accept_language)?,
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    let client = Client::builder()
        .user_agent(header_value("user-agent", &config.user_agent)?)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Classifies an error raised before a response arrived
fn classify_send_error(e: reqwest::Error) -> FetchFailure {
    let detail = error_chain(&e);
    if e.is_timeout() {
        FetchFailure::Timeout(detail)
    } else if e.is_connect() || e.is_request() {
        FetchFailure::Network(detail)
    } else {
        FetchFailure::Unknown(detail)
    }
}

/// Classifies an error raised while reading the response body
fn classify_body_error(e: reqwest::Error) -> FetchFailure {
    let detail = error_chain(&e);
    if e.is_timeout() {
        FetchFailure::Timeout(detail)
    } else {
        FetchFailure::Unknown(detail)
    }
}

/// Joins an error and its sources into one message
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
