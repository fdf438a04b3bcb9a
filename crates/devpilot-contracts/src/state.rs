//! Per-thread conversation state.
//!
//! `AgentState` is the whole of a thread's conversation: the ordered
//! transcript, the rolling summary, the cumulative progress log, and the
//! per-thread approval policy. The graph passes it by `&mut` through each
//! node; nothing else holds it while a node runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{DevpilotError, DevpilotResult},
    message::{Arguments, Message, Role, ToolCall},
};

/// Per-thread toggle: when `Yes`, approval-requiring tools run without a
/// human decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoApprove {
    Yes,
    #[default]
    No,
}

/// One progress record for a tool call, shown to operators while it runs.
///
/// Entries are appended with `done = false` and flipped in place once the
/// call finishes. The aborted-command entry written on denial is created
/// already done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    /// The call's raw arguments.
    pub command: Value,
    pub done: bool,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub description: String,
}

impl LogEntry {
    /// An in-flight entry for a call that is about to be dispatched.
    pub fn running(call: &ToolCall, description: impl Into<String>) -> Self {
        Self {
            message: format!("running command {}", call.name),
            command: Value::Object(call.arguments.clone()),
            done: false,
            result: String::new(),
            description: description.into(),
        }
    }

    /// The record of a call a human declined.
    pub fn aborted(arguments: &Arguments) -> Self {
        Self {
            message: "Aborted cmd".to_string(),
            command: Value::Object(arguments.clone()),
            done: true,
            result: String::new(),
            description: String::new(),
        }
    }

    /// A finished entry recording a failure outside any tool adapter, such as
    /// a model call that missed its deadline.
    pub fn failed(message: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            command: Value::Object(Arguments::new()),
            done: true,
            result: result.into(),
            description: String::new(),
        }
    }

    /// Flip the entry to done with its final result.
    pub fn complete(&mut self, result: impl Into<String>) {
        self.result = result.into();
        self.done = true;
    }
}

/// An advisory suggestion surfaced to the operator UI. Opaque to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
}

/// The call the graph should act on next, and where its approval marker sits.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    pub call: ToolCall,
    /// Transcript index of the decision marker answering this call, if any.
    pub placeholder: Option<usize>,
}

/// The full conversation state of one thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Insertion order is conversation order; never reordered.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Rolling summary, empty until the first compaction.
    #[serde(default)]
    pub summary: String,
    /// Cumulative across the thread; never shrinks.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub auto_approve: AutoApprove,
    #[serde(default, rename = "devopsSuggestions")]
    pub suggestions: Vec<Suggestion>,
}

impl AgentState {
    pub fn new(auto_approve: AutoApprove) -> Self {
        Self {
            auto_approve,
            ..Self::default()
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// True when neither of the two most recent messages proposes tool calls.
    pub fn tail_is_settled(&self) -> bool {
        self.messages
            .iter()
            .rev()
            .take(2)
            .all(|m| !m.has_tool_calls())
    }

    /// The trailing proposal: the assistant message with tool calls that is
    /// followed only by tool-role messages. Returns its transcript index.
    pub fn open_proposal(&self) -> Option<(usize, &Message)> {
        let (idx, message) = self
            .messages
            .iter()
            .enumerate()
            .rev()
            .find(|(_, m)| m.role != Role::Tool)?;
        (message.role == Role::Assistant && message.has_tool_calls()).then_some((idx, message))
    }

    /// Calls on the trailing proposal that no tool result answers yet, in
    /// proposal order. Decision markers do not count as answers.
    pub fn unanswered_calls(&self) -> Vec<&ToolCall> {
        let Some((idx, proposal)) = self.open_proposal() else {
            return Vec::new();
        };
        let tail = &self.messages[idx + 1..];
        proposal
            .tool_calls
            .iter()
            .filter(|call| !tail.iter().any(|m| m.answers(&call.id)))
            .collect()
    }

    /// Resolve the call the graph must act on, located by id: the unanswered
    /// call a decision marker refers to if there is one, otherwise the first
    /// unanswered call of the trailing proposal.
    ///
    /// # Errors
    ///
    /// `StateInconsistency` when the transcript does not end in a proposal
    /// (optionally followed by tool messages) or every call is answered.
    pub fn pending_call(&self) -> DevpilotResult<PendingCall> {
        let (idx, _) = self.open_proposal().ok_or_else(|| {
            DevpilotError::inconsistent("no recent message carries a pending tool call")
        })?;
        let unanswered = self.unanswered_calls();
        let marker_for = |call: &ToolCall| {
            self.messages[idx + 1..]
                .iter()
                .position(|m| m.decision.is_some() && m.tool_call_id.as_deref() == Some(call.id.as_str()))
                .map(|offset| idx + 1 + offset)
        };

        if let Some((call, placeholder)) = unanswered
            .iter()
            .find_map(|call| marker_for(*call).map(|at| (*call, at)))
        {
            return Ok(PendingCall {
                call: call.clone(),
                placeholder: Some(placeholder),
            });
        }

        let call = unanswered.first().ok_or_else(|| {
            DevpilotError::inconsistent("every proposed tool call is already answered")
        })?;
        Ok(PendingCall {
            call: (*call).clone(),
            placeholder: None,
        })
    }

    /// True if a message with the same id is already in the transcript.
    pub fn contains_message(&self, message: &Message) -> bool {
        self.messages.iter().any(|m| m.id == message.id)
    }
}
