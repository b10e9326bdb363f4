//! Keyword-Probe: concurrent keyword checker for URL lists
//!
//! This crate fetches a list of candidate URLs concurrently, keeps the ones
//! whose content contains a keyword, and appends every match to an output file
//! as soon as it is found through a single background writer.

pub mod config;
pub mod output;
pub mod probe;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Exit status for a run that completed (with or without matches)
pub const EXIT_OK: u8 = 0;

/// Exit status when the input file does not exist
pub const EXIT_INPUT_NOT_FOUND: u8 = 2;

/// Exit status for any other fatal error
pub const EXIT_FATAL: u8 = 3;

/// Exit status for a run stopped by an interrupt after flushing its matches
pub const EXIT_INTERRUPTED: u8 = 130;

/// Main error type for Keyword-Probe operations
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Failed to read input file {}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Result sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PipelineState,
        to: state::PipelineState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Maps the error to the process exit status reported by the CLI
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InputNotFound { .. } => EXIT_INPUT_NOT_FOUND,
            _ => EXIT_FATAL,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid header value for {name}: {value}")]
    InvalidHeader { name: String, value: String },
}

/// Result type alias for Keyword-Probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use crate::config::ProbeConfig;
pub use crate::output::{FetchOutcome, ResultSink, RunReport, SinkReport};
pub use crate::probe::{matches, FetchFailure, HttpFetcher, PageFetcher, Pipeline};
pub use crate::state::PipelineState;
pub use crate::url::is_valid_url;
