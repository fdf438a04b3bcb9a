//! The approval gate's review stage.
//!
//! Suspension itself is handled by the engine: it checkpoints the thread as
//! awaiting a decision and returns. When a decision arrives the engine
//! stores it as a marker answering the paused call and enters this node.

use tracing::info;

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    execution::ThreadId,
    message::{Decision, Message},
    state::{AgentState, LogEntry},
};

use crate::{engine::GraphEngine, nodes::Review};

impl GraphEngine {
    /// Apply the stored decision for the pending call.
    ///
    /// `YES` leaves the marker in place for the tool node to overwrite with
    /// the real result. `NO` records an aborted entry and replaces the
    /// marker, in place and under the same id, with a tool result of exactly
    /// `"NO"`, ending the turn.
    pub(crate) fn human_review(
        &self,
        thread_id: &ThreadId,
        state: &mut AgentState,
    ) -> DevpilotResult<Review> {
        let pending = state.pending_call()?;
        let idx = pending.placeholder.ok_or_else(|| DevpilotError::StateInconsistency {
            reason: format!("no decision answers pending call '{}'", pending.call.id),
        })?;
        let decision = state.messages[idx].decision.ok_or_else(|| DevpilotError::StateInconsistency {
            reason: format!("message at {idx} is not a decision marker"),
        })?;

        let call = pending.call;
        match decision {
            Decision::Yes => {
                info!(thread_id = %thread_id, call_id = %call.id, tool = %call.name, "call approved");
                self.publish(thread_id, state);
                Ok(Review::Approved)
            }
            Decision::No => {
                info!(thread_id = %thread_id, call_id = %call.id, tool = %call.name, "call declined");
                state.logs.push(LogEntry::aborted(&call.arguments));
                self.publish(thread_id, state);

                // Keep the marker's id so a redelivered decision is seen as applied.
                let marker_id = state.messages[idx].id.clone();
                state.messages[idx] = Message {
                    id: marker_id,
                    ..Message::tool_result(call.id.clone(), call.name.clone(), Decision::No.as_str())
                };
                self.publish(thread_id, state);
                Ok(Review::Denied(call))
            }
        }
    }
}
