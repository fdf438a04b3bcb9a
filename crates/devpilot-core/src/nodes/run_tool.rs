//! The tool node: execute the pending call and fold its result in.

use tokio::time::timeout;
use tracing::{debug, info, warn};

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    execution::ThreadId,
    message::{Message, ToolCall},
    state::{AgentState, LogEntry},
};

use crate::{
    engine::GraphEngine,
    prompt::DOCUMENT_SUMMARY_INSTRUCTION,
    registry::RegisteredTool,
    traits::CompletionRequest,
};

impl GraphEngine {
    /// Execute the first unanswered call of the trailing proposal.
    ///
    /// # Pipeline
    ///
    /// 1. Resolve the call and its decision marker, if one exists
    /// 2. Append a running log entry and broadcast
    /// 3. Verify arguments; a failure becomes the result and the adapter
    ///    never runs
    /// 4. Invoke the adapter under the tool timeout
    /// 5. Retrieval tools: replace the raw output with a model-written digest
    /// 6. Complete the log entry and broadcast
    /// 7. Overwrite the marker with the result, or append a tool message
    ///
    /// # Errors
    ///
    /// `UnknownTool` after answering the call with an error notice, so the
    /// transcript never keeps an unanswered proposal. `ModelFailure` from the
    /// digest pass after completing the log entry with the failure.
    pub(crate) async fn run_tool(&self, thread_id: &ThreadId, state: &mut AgentState) -> DevpilotResult<()> {
        // ── Step 1: Resolve the call ─────────────────────────────────────────
        let pending = state.pending_call()?;
        let call = pending.call;

        let Some(tool) = self.registry.get(&call.name) else {
            warn!(thread_id = %thread_id, tool = %call.name, "model called an unregistered tool");
            fold_result(
                state,
                &call,
                pending.placeholder,
                format!("Error: tool '{}' is not registered", call.name),
            );
            self.publish(thread_id, state);
            return Err(DevpilotError::UnknownTool { name: call.name });
        };

        // ── Step 2: Progress entry ───────────────────────────────────────────
        let entry = state.logs.len();
        state
            .logs
            .push(LogEntry::running(&call, self.registry.description(&call.name)));
        self.publish(thread_id, state);

        // ── Step 3: Argument verification ────────────────────────────────────
        let report = match self.verifier.verify(&tool.spec, &call.arguments) {
            Ok(report) => report,
            Err(err) => {
                state.logs[entry].complete(format!("Error: {err}"));
                fold_result(state, &call, pending.placeholder, format!("Error: {err}"));
                self.publish(thread_id, state);
                return Err(err);
            }
        };

        // ── Steps 4 & 5: Execute, then digest retrieval output ──────────────
        let result = if !report.passed {
            warn!(
                thread_id = %thread_id,
                tool = %call.name,
                failures = %report.summary(),
                "tool arguments rejected"
            );
            format!("Error: invalid arguments for {}: {}", call.name, report.summary())
        } else {
            let raw = self.invoke_adapter(thread_id, &call, tool).await;
            if tool.spec.retrieval {
                match self.digest(&raw).await {
                    Ok(digest) => digest,
                    Err(err) => {
                        state.logs[entry].complete(format!("Error: {err}"));
                        fold_result(state, &call, pending.placeholder, format!("Error: {err}"));
                        self.publish(thread_id, state);
                        return Err(err);
                    }
                }
            } else {
                raw
            }
        };

        // ── Steps 6 & 7: Record the result ───────────────────────────────────
        state.logs[entry].complete(result.clone());
        self.publish(thread_id, state);
        fold_result(state, &call, pending.placeholder, result);

        Ok(())
    }

    async fn invoke_adapter(&self, thread_id: &ThreadId, call: &ToolCall, tool: &RegisteredTool) -> String {
        info!(thread_id = %thread_id, call_id = %call.id, tool = %call.name, "running tool");
        match timeout(self.config.tool_timeout(), tool.adapter.invoke(&call.arguments)).await {
            Ok(output) => {
                debug!(thread_id = %thread_id, tool = %call.name, bytes = output.len(), "tool finished");
                output
            }
            Err(_) => {
                warn!(
                    thread_id = %thread_id,
                    tool = %call.name,
                    timeout_secs = self.config.tool_timeout_secs,
                    "tool timed out"
                );
                format!(
                    "Error: tool '{}' timed out after {}s",
                    call.name, self.config.tool_timeout_secs
                )
            }
        }
    }

    /// Summarize raw retrieval output with a tool-free model call.
    async fn digest(&self, raw: &str) -> DevpilotResult<String> {
        let request = CompletionRequest::text_only(vec![
            Message::human(raw),
            Message::human(DOCUMENT_SUMMARY_INSTRUCTION),
        ]);
        match timeout(self.config.model_timeout(), self.model.complete(request)).await {
            Ok(response) => Ok(response?.content),
            Err(_) => Ok(format!(
                "Error: document summary timed out after {}s",
                self.config.model_timeout_secs
            )),
        }
    }
}

/// Answer `call` with `content`: overwrite its decision marker when there is
/// one, otherwise append a tool message.
fn fold_result(state: &mut AgentState, call: &ToolCall, placeholder: Option<usize>, content: String) {
    match placeholder {
        Some(idx) => {
            let marker = &mut state.messages[idx];
            marker.content = content;
            marker.decision = None;
            marker.name = Some(call.name.clone());
        }
        None => state
            .messages
            .push(Message::tool_result(call.id.clone(), call.name.clone(), content)),
    }
}
