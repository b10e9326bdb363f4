//! State module for tracking pipeline progress
//!
//! # Components
//!
//! - `PipelineState`: Lifecycle of a single run (idle, validating, running, draining, done)

mod pipeline_state;

// Re-export main types
pub use pipeline_state::PipelineState;
