//! The graph's node bodies.
//!
//! Each node is an `impl GraphEngine` block that mutates the thread's state
//! in place. Routing between nodes lives in `router`; persistence and the
//! execution loop live in `engine`.

mod approval;
mod assistant;
mod compactor;
mod run_tool;

pub use compactor::retention_window;

use devpilot_contracts::message::ToolCall;

/// How a model-calling node finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeExit {
    Done,
    /// The model missed its deadline; a failed log entry was recorded.
    TimedOut,
}

/// The human review verdict applied to the state.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Review {
    Approved,
    Denied(ToolCall),
}
