//! Pipeline state definitions for tracking run progress

use std::fmt;

/// Represents the current phase of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    // ===== Active States =====
    /// Pipeline constructed, nothing read yet
    Idle,

    /// Input file read, candidates being validated
    Validating,

    /// Sink started, fetch units in flight
    Running,

    /// All fetch units finished, sink flushing
    Draining,

    // ===== Terminal States =====
    /// Run completed and the sink is stopped
    Done,

    /// Setup failed, or the sink worker died while draining
    Failed,
}

impl PipelineState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if the transition `self -> next` is part of the lifecycle
    ///
    /// Setup phases may fail, and so may draining if the sink worker died.
    /// Fetch failures never fail a running pipeline.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Validating)
                | (Self::Idle, Self::Failed)
                | (Self::Validating, Self::Running)
                | (Self::Validating, Self::Failed)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Done)
                | (Self::Draining, Self::Failed)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
