//! Thread execution status, checkpoints, and run outcomes.
//!
//! `RunOutcome` is what the graph engine returns to the caller after driving
//! a thread as far as it can go. `Checkpoint` is what the engine persists at
//! every node boundary and on suspension.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{message::ToolCall, state::AgentState};

/// Opaque identifier of one conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// Create a new, unique thread ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The nodes of the orchestration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "human_node")]
    HumanNode,
    #[serde(rename = "human_review_node")]
    HumanReview,
    #[serde(rename = "run_tool")]
    RunTool,
    #[serde(rename = "summarize_conversation")]
    Summarize,
    #[serde(rename = "__end__")]
    End,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Node::Assistant => "assistant",
            Node::HumanNode => "human_node",
            Node::HumanReview => "human_review_node",
            Node::RunTool => "run_tool",
            Node::Summarize => "summarize_conversation",
            Node::End => "__end__",
        };
        f.write_str(name)
    }
}

/// Per-thread execution status, persisted alongside the state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ThreadStatus {
    /// An execution is between nodes. Seen in storage only if it was
    /// interrupted before reaching an exit.
    Running,

    /// Paused at the approval gate until a decision for `call_id` arrives.
    AwaitingApproval { call_id: String, tool_name: String },

    /// No execution in flight; the thread accepts a new user turn.
    #[default]
    Terminal,
}

/// The persisted snapshot of one thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: ThreadId,
    pub state: AgentState,
    pub status: ThreadStatus,
    /// The node the execution will enter next while `Running`.
    pub next: Option<Node>,
    /// Incremented on every save.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// The empty checkpoint of a thread that has never been seen.
    pub fn fresh(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            state: AgentState::default(),
            status: ThreadStatus::Terminal,
            next: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

/// The outcome of driving a thread until it exits or suspends.
///
/// Callers pattern-match on this:
/// - `Completed` → the model produced a final answer
/// - `AwaitingApproval` → surface the call to a human, then deliver a decision
/// - `Denied` → the human declined; a fresh user turn is required
/// - `TimedOut` → an external call missed its deadline; recorded in `logs`
/// - `Ignored` → the inbound message was a replay and nothing changed
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed {
        state: AgentState,
    },
    AwaitingApproval {
        call: ToolCall,
        /// Why approval is required.
        reason: String,
        state: AgentState,
    },
    Denied {
        call: ToolCall,
        state: AgentState,
    },
    TimedOut {
        /// The node whose external call expired.
        stage: Node,
        state: AgentState,
    },
    Ignored {
        reason: String,
        state: AgentState,
    },
}

impl RunOutcome {
    pub fn state(&self) -> &AgentState {
        match self {
            RunOutcome::Completed { state }
            | RunOutcome::AwaitingApproval { state, .. }
            | RunOutcome::Denied { state, .. }
            | RunOutcome::TimedOut { state, .. }
            | RunOutcome::Ignored { state, .. } => state,
        }
    }
}

/// What the engine publishes to external observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum BroadcastEvent {
    /// The full state at a node boundary or around an external call.
    Snapshot { state: AgentState },
    /// A tool call the model just proposed, materialized for the operator.
    ToolCallProposed { call: ToolCall },
}
