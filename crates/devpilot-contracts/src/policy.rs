//! Approval verdict and evaluation context types.
//!
//! The approval policy consumes an `ApprovalContext` and produces an
//! `ApprovalVerdict`. The router gates on the first call of a turn whose
//! verdict is not `Allow`.

use serde::{Deserialize, Serialize};

use crate::state::AutoApprove;

/// The decision emitted by the approval policy for a single tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalVerdict {
    /// The call may run without a human decision.
    Allow,

    /// The call is suspended until a human answers `"YES"` or `"NO"`.
    RequireApproval {
        /// Human-readable explanation shown alongside the paused call.
        reason: String,
    },
}

/// Everything the approval policy needs to decide about one call.
///
/// All fields are plain values so policies can be written without depending
/// on the transcript types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalContext {
    pub thread_id: String,
    pub tool_name: String,
    /// The call's sub-operation (first positional token), if it has one.
    pub operation: Option<String>,
    pub auto_approve: AutoApprove,
}
