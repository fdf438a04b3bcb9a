//! Runtime error types for the devpilot orchestration graph.
//!
//! All fallible operations in the runtime return `DevpilotResult<T>`.
//! Tool failures are deliberately absent: an adapter that fails produces a
//! result string that is folded into the transcript, not an error value.

use thiserror::Error;

/// The unified error type for the devpilot runtime.
#[derive(Debug, Error)]
pub enum DevpilotError {
    /// Dispatch was requested for a tool name that is not registered.
    #[error("unknown tool '{name}'")]
    UnknownTool { name: String },

    /// Routing or approval logic found neither of the expected message shapes.
    ///
    /// This indicates a bug in a calling layer and is never swallowed.
    #[error("state inconsistency: {reason}")]
    StateInconsistency { reason: String },

    /// A paused thread received something other than `"YES"` or `"NO"`.
    #[error("invalid approval decision '{content}': expected \"YES\" or \"NO\"")]
    InvalidDecision { content: String },

    /// A decision was sent to a thread that is not paused at the gate.
    #[error("thread '{thread_id}' is not awaiting an approval decision")]
    NoPendingApproval { thread_id: String },

    /// The language model call failed. Retry policy belongs to the model client.
    #[error("language model failure: {reason}")]
    ModelFailure { reason: String },

    /// The checkpoint store could not load or persist a thread.
    #[error("checkpoint store failure: {reason}")]
    CheckpointFailed { reason: String },

    /// The thread's last checkpoint shows an execution still in flight.
    #[error("thread '{thread_id}' has an interrupted execution; resume it first")]
    ThreadBusy { thread_id: String },

    /// The graph visited more nodes than the configured limit in one run.
    #[error("step limit of {limit} nodes exceeded")]
    StepLimitExceeded { limit: usize },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl DevpilotError {
    /// True when the failure means the orchestration itself is broken, as
    /// opposed to the task failing.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DevpilotError::UnknownTool { .. }
                | DevpilotError::StateInconsistency { .. }
                | DevpilotError::StepLimitExceeded { .. }
        )
    }

    pub(crate) fn inconsistent(reason: impl Into<String>) -> Self {
        DevpilotError::StateInconsistency {
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the devpilot crates.
pub type DevpilotResult<T> = Result<T, DevpilotError>;
