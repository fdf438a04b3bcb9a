//! The assistant node: one model turn.

use tokio::time::timeout;
use tracing::{debug, warn};

use devpilot_contracts::{
    error::DevpilotResult,
    execution::{BroadcastEvent, ThreadId},
    message::{Message, Role},
    state::{AgentState, AutoApprove, LogEntry},
};

use crate::{
    engine::GraphEngine,
    nodes::NodeExit,
    prompt::summary_system_prompt,
    traits::CompletionRequest,
};

impl GraphEngine {
    /// Ask the model for the next turn and append its reply.
    ///
    /// The prompt is the rolling summary (or the configured system prompt
    /// when there is none) followed by the whole transcript. Proposed calls
    /// to tools in `emit_tool_calls` are broadcast for preview unless the
    /// thread auto-approves.
    pub(crate) async fn assistant(
        &self,
        thread_id: &ThreadId,
        state: &mut AgentState,
    ) -> DevpilotResult<NodeExit> {
        self.publish(thread_id, state);

        let request = CompletionRequest::with_tools(self.prompt(state), self.registry.specs());
        let mut response = match timeout(self.config.model_timeout(), self.model.complete(request)).await {
            Ok(response) => response?,
            Err(_) => {
                warn!(
                    thread_id = %thread_id,
                    timeout_secs = self.config.model_timeout_secs,
                    "model call timed out"
                );
                state.logs.push(LogEntry::failed(
                    "Model call timed out",
                    format!("Error: no response within {}s", self.config.model_timeout_secs),
                ));
                self.publish(thread_id, state);
                return Ok(NodeExit::TimedOut);
            }
        };
        response.role = Role::Assistant;

        debug!(
            thread_id = %thread_id,
            tool_calls = response.tool_calls.len(),
            "model responded"
        );

        if state.auto_approve == AutoApprove::No {
            for call in response.tool_calls.iter().filter(|c| self.config.emits(&c.name)) {
                self.broadcaster
                    .publish(thread_id, &BroadcastEvent::ToolCallProposed { call: call.clone() });
            }
        }

        state.messages.push(response);
        self.publish(thread_id, state);
        Ok(NodeExit::Done)
    }

    fn prompt(&self, state: &AgentState) -> Vec<Message> {
        let head = if state.summary.is_empty() {
            Message::system(self.config.system_prompt.clone())
        } else {
            Message::system(summary_system_prompt(&state.summary))
        };
        std::iter::once(head)
            .chain(state.messages.iter().cloned())
            .collect()
    }
}
