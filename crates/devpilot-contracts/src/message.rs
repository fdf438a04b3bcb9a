//! Transcript message types.
//!
//! Messages are tagged explicitly: an assistant message that proposes work
//! stores its `ToolCall`s directly, and every tool-role message stores the id
//! of the call it answers. Routing and execution look calls up by id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool arguments as produced by the model: a string-keyed JSON object.
pub type Arguments = Map<String, Value>;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
    Assistant,
    Tool,
}

/// Unique identifier of one transcript message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Create a new, unique message ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// A structured request, proposed by the model, to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique within the proposing turn.
    pub id: String,
    /// Must name a tool in the registry.
    pub name: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// The sub-operation this call performs: the first positional token of a
    /// `command` argument (`"delete deployment web"` → `"delete"`), or the
    /// `operation` argument for tools that take one explicitly.
    pub fn operation(&self) -> Option<&str> {
        if let Some(command) = self.arguments.get("command").and_then(Value::as_str) {
            return command.split_whitespace().next();
        }
        self.arguments
            .get("operation")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|op| !op.is_empty())
    }
}

/// A human approval decision. Only the literal strings `"YES"` and `"NO"`
/// are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Yes,
    No,
}

impl Decision {
    pub fn parse(content: &str) -> Option<Self> {
        match content {
            "YES" => Some(Decision::Yes),
            "NO" => Some(Decision::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Yes => "YES",
            Decision::No => "NO",
        }
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: MessageId,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool-role messages: the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For tool-role messages: the tool that produced the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Set while this tool-role message is a transient approval marker
    /// rather than a real tool result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            decision: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::with_role(Role::Human, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// An assistant message proposing `calls`.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// A tool result answering the call `call_id`.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            name: Some(tool_name.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    /// The transient marker that carries a human decision for `call_id`.
    pub fn decision(call_id: impl Into<String>, decision: Decision) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            decision: Some(decision),
            ..Self::with_role(Role::Tool, decision.as_str())
        }
    }

    /// True when this message proposes at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// True when this is a tool result (not a decision marker) for `call_id`.
    pub fn answers(&self, call_id: &str) -> bool {
        self.role == Role::Tool
            && self.decision.is_none()
            && self.tool_call_id.as_deref() == Some(call_id)
    }
}
