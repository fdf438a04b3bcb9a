//! Core trait definitions for the devpilot orchestration graph.
//!
//! These traits are the graph's external contracts:
//!
//! - `LanguageModel`     untrusted planner (proposes replies and tool calls)
//! - `ToolAdapter`       side-effecting executor for one named tool
//! - `ApprovalPolicy`    gate deciding which calls need a human decision
//! - `ArgumentVerifier`  checks call arguments before any adapter runs
//! - `CheckpointStore`   durable per-thread state
//! - `StateBroadcaster`  fire-and-forget observer of state changes
//!
//! The engine wires them together. An adapter is never invoked for a call
//! the approval policy gated until a `"YES"` decision for that call exists.

use async_trait::async_trait;

use devpilot_contracts::{
    error::DevpilotResult,
    execution::{BroadcastEvent, Checkpoint, ThreadId},
    message::{Arguments, Message},
    policy::{ApprovalContext, ApprovalVerdict},
    tool::ToolSpec,
    verify::ArgumentReport,
};

/// Whether the model may answer with tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    /// At most one tool call per response.
    Single,
    /// Plain text only. Used for summarization passes.
    None,
}

/// One request to the language model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    /// Tools the model may call. Empty when `tool_choice` is `None`.
    pub tools: Vec<ToolSpec>,
    pub tool_choice: ToolChoice,
}

impl CompletionRequest {
    pub fn with_tools(messages: Vec<Message>, tools: Vec<ToolSpec>) -> Self {
        Self {
            messages,
            tools,
            tool_choice: ToolChoice::Single,
        }
    }

    /// A plain-text request with no tools bound.
    pub fn text_only(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            tool_choice: ToolChoice::None,
        }
    }
}

/// A chat-completion model.
///
/// Implementations are **untrusted**: anything they return is treated as a
/// proposal. The returned message is stored with its role forced to
/// assistant. Retries and rate limiting belong inside the implementation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce one response for `request`.
    ///
    /// # Errors
    ///
    /// `ModelFailure` when the provider cannot be reached or answers with
    /// something that is not a chat message.
    async fn complete(&self, request: CompletionRequest) -> DevpilotResult<Message>;
}

/// The executor behind one registered tool.
///
/// Adapters never fail: subprocess errors, HTTP errors, and bad input all
/// come back as a human-readable result string that the graph folds into the
/// transcript for the model to reason about.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    async fn invoke(&self, arguments: &Arguments) -> String;
}

/// Decides whether a proposed call must wait for a human.
///
/// Implementations must be deterministic and cheap: the router calls this
/// for every proposed call on every turn.
pub trait ApprovalPolicy: Send + Sync {
    fn evaluate(&self, ctx: &ApprovalContext) -> ApprovalVerdict;
}

/// Checks a call's arguments against its tool's declared parameters.
pub trait ArgumentVerifier: Send + Sync {
    /// Return a report with `passed = false` and populated failures when the
    /// arguments do not fit. `Err` is reserved for a broken schema.
    fn verify(&self, spec: &ToolSpec, arguments: &Arguments) -> DevpilotResult<ArgumentReport>;
}

/// Durable per-thread checkpoint storage.
///
/// A failed save is fatal for the current execution: the engine stops and
/// surfaces `CheckpointFailed` rather than run nodes it cannot record.
pub trait CheckpointStore: Send + Sync {
    /// Load the latest checkpoint, or `None` for a thread never seen.
    fn load(&self, thread_id: &ThreadId) -> DevpilotResult<Option<Checkpoint>>;

    /// Persist `checkpoint` as the thread's latest.
    fn save(&self, checkpoint: &Checkpoint) -> DevpilotResult<()>;
}

/// Receives state snapshots and proposed calls as the graph runs.
///
/// Delivery is best-effort. Implementations must not block and must swallow
/// their own failures.
pub trait StateBroadcaster: Send + Sync {
    fn publish(&self, thread_id: &ThreadId, event: &BroadcastEvent);
}

/// A broadcaster that drops every event.
pub struct NullBroadcaster;

impl StateBroadcaster for NullBroadcaster {
    fn publish(&self, _thread_id: &ThreadId, _event: &BroadcastEvent) {}
}
