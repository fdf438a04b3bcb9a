//! Tool catalog entries.
//!
//! A `ToolSpec` is the static, read-only description of one registered tool:
//! what the model is told about it, whether a human must sign off before it
//! runs, and whether its raw output needs a summarization pass.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static description of one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Stable name the model uses to call the tool (e.g. "kubectl_exec").
    pub name: String,

    /// Human-readable description, shown to the model and in progress logs.
    pub description: String,

    /// JSON Schema of the arguments object. `Null` means unconstrained.
    #[serde(default)]
    pub parameters: Value,

    /// Whether calls to this tool are gated on human approval when the
    /// thread's `auto_approve` is `no`.
    #[serde(default)]
    pub requires_approval: bool,

    /// Sub-operations (first positional token) classified as sensitive,
    /// e.g. "delete", "apply".
    #[serde(default)]
    pub dangerous_operations: Vec<String>,

    /// Retrieval-class tools return a document corpus that is summarized by
    /// a secondary model call before entering the transcript.
    #[serde(default)]
    pub retrieval: bool,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Value::Null,
            requires_approval: false,
            dangerous_operations: Vec::new(),
            retrieval: false,
        }
    }

    /// True if `operation` is one of this tool's sensitive sub-operations.
    pub fn is_dangerous(&self, operation: &str) -> bool {
        self.dangerous_operations.iter().any(|op| op == operation)
    }
}
