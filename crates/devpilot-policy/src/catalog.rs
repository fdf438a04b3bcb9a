//! Tool catalog schema.
//!
//! A `ToolCatalog` is deserialized from TOML and holds the ordered list of
//! tools presented to the model, plus the approval gate mode.

use serde::{Deserialize, Serialize};

use devpilot_contracts::tool::ToolSpec;

/// How approval-requiring tools are gated.
///
/// ```toml
/// [approval]
/// gate = "tool"       # every call to the tool pauses
/// gate = "operation"  # only calls whose operation is dangerous pause
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateMode {
    #[default]
    Tool,
    Operation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSettings {
    #[serde(default)]
    pub gate: GateMode,
}

/// The top-level structure deserialized from a catalog file.
///
/// Example:
/// ```toml
/// [[tools]]
/// name = "kubectl_exec"
/// description = "Execute Kubernetes commands"
/// requires_approval = true
/// dangerous_operations = ["delete", "apply"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCatalog {
    #[serde(default)]
    pub approval: ApprovalSettings,
    /// Declaration order is the order tools are offered to the model.
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

impl ToolCatalog {
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }
}
