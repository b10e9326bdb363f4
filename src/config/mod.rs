//! Configuration module for Keyword-Probe
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Every key has a default, so a run without a config
//! file uses [`ProbeConfig::default`].
//!
//! # Example
//!
//! ```no_run
//! use keyword_probe::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("probe.toml")).unwrap();
//! println!("Max concurrent fetches: {}", config.pipeline.max_concurrent_fetches);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{FetchConfig, PipelineConfig, ProbeConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
