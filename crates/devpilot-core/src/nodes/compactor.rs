//! The compactor: fold old transcript into the rolling summary.

use tokio::time::timeout;
use tracing::{info, warn};

use devpilot_contracts::{
    error::DevpilotResult,
    execution::ThreadId,
    message::{Message, Role},
    state::{AgentState, LogEntry},
};

use crate::{engine::GraphEngine, prompt::compaction_instruction, traits::CompletionRequest};

/// How many trailing messages survive compaction.
///
/// `keep`, widened while the window would open on a tool result, so tool
/// messages never lose the proposal they answer. A single-call proposal
/// widens by one; a multi-call proposal by one per sibling result.
pub fn retention_window(messages: &[Message], keep: usize) -> usize {
    let len = messages.len();
    let keep = keep.min(len);
    if keep == 0 {
        return 0;
    }
    let mut start = len - keep;
    while start > 0 && messages[start].role == Role::Tool {
        start -= 1;
    }
    len - start
}

impl GraphEngine {
    /// Summarize the transcript and drop all but the retention window.
    ///
    /// A timeout skips compaction for this turn; the transcript is left
    /// whole and a failed entry is logged.
    pub(crate) async fn summarize(&self, thread_id: &ThreadId, state: &mut AgentState) -> DevpilotResult<()> {
        let mut messages = state.messages.clone();
        messages.push(Message::human(compaction_instruction(&state.summary)));

        let response = match timeout(
            self.config.model_timeout(),
            self.model.complete(CompletionRequest::text_only(messages)),
        )
        .await
        {
            Ok(response) => response?,
            Err(_) => {
                warn!(thread_id = %thread_id, "summarization timed out, transcript left whole");
                state.logs.push(LogEntry::failed(
                    "Summarization timed out",
                    format!("Error: no summary within {}s", self.config.model_timeout_secs),
                ));
                self.publish(thread_id, state);
                return Ok(());
            }
        };

        let keep = retention_window(&state.messages, self.config.keep_after_summary);
        let evicted = state.messages.len() - keep;
        state.messages.drain(..evicted);
        state.summary = response.content;

        info!(thread_id = %thread_id, evicted, kept = keep, "conversation compacted");
        self.publish(thread_id, state);
        Ok(())
    }
}
