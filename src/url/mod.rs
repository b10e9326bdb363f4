//! URL handling module for Keyword-Probe
//!
//! This module provides URL validation and reading of candidate URL lists.

mod input;
mod validate;

// Re-export main functions
pub use input::{partition_candidates, read_candidates, split_candidates};
pub use validate::is_valid_url;
