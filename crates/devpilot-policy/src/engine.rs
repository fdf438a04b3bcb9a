//! Catalog-driven approval policy.
//!
//! `CatalogApprovalPolicy` loads a `ToolCatalog` from a TOML string or file
//! and implements the `ApprovalPolicy` trait from devpilot-core.
//!
//! Evaluation algorithm:
//!
//! 1. `auto_approve = yes` → `Allow`.
//! 2. Tool absent from the catalog, or not `requires_approval` → `Allow`.
//! 3. `gate = "tool"` → `RequireApproval`.
//! 4. `gate = "operation"` → `RequireApproval` if the call's operation is in
//!    `dangerous_operations`, or the list is empty; otherwise `Allow`.

use std::path::Path;

use tracing::debug;

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    policy::{ApprovalContext, ApprovalVerdict},
    state::AutoApprove,
    tool::ToolSpec,
};
use devpilot_core::traits::ApprovalPolicy;

use crate::catalog::{GateMode, ToolCatalog};

/// The catalog shipped with the runtime.
pub const BUILTIN_CATALOG: &str = include_str!("../policies/devops.toml");

#[derive(Debug, Clone)]
pub struct CatalogApprovalPolicy {
    catalog: ToolCatalog,
}

impl CatalogApprovalPolicy {
    /// Parse `s` as a TOML tool catalog.
    ///
    /// Returns `DevpilotError::ConfigError` if the TOML is malformed, does not
    /// match the catalog schema, or declares a tool name twice.
    pub fn from_toml_str(s: &str) -> DevpilotResult<Self> {
        let catalog: ToolCatalog = toml::from_str(s).map_err(|e| DevpilotError::ConfigError {
            reason: format!("failed to parse tool catalog TOML: {}", e),
        })?;

        for (i, tool) in catalog.tools.iter().enumerate() {
            if catalog.tools[..i].iter().any(|t| t.name == tool.name) {
                return Err(DevpilotError::ConfigError {
                    reason: format!("tool '{}' is declared more than once", tool.name),
                });
            }
        }
        Ok(Self { catalog })
    }

    pub fn from_file(path: &Path) -> DevpilotResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| DevpilotError::ConfigError {
            reason: format!("failed to read tool catalog '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The built-in DevOps catalog.
    pub fn builtin() -> DevpilotResult<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.catalog.tools
    }

    pub fn gate(&self) -> GateMode {
        self.catalog.approval.gate
    }
}

impl ApprovalPolicy for CatalogApprovalPolicy {
    fn evaluate(&self, ctx: &ApprovalContext) -> ApprovalVerdict {
        if ctx.auto_approve == AutoApprove::Yes {
            return ApprovalVerdict::Allow;
        }

        let Some(spec) = self.catalog.get(&ctx.tool_name) else {
            debug!(tool = %ctx.tool_name, "tool not in catalog, not gating");
            return ApprovalVerdict::Allow;
        };
        if !spec.requires_approval {
            return ApprovalVerdict::Allow;
        }

        let dangerous = ctx.operation.as_deref().filter(|op| spec.is_dangerous(op));

        let gated = match self.catalog.approval.gate {
            GateMode::Tool => true,
            GateMode::Operation => spec.dangerous_operations.is_empty() || dangerous.is_some(),
        };
        if !gated {
            debug!(
                tool = %ctx.tool_name,
                operation = ?ctx.operation,
                "operation not classified dangerous, allowing"
            );
            return ApprovalVerdict::Allow;
        }

        let reason = match dangerous {
            Some(op) => format!("'{}' operation '{}' requires approval", ctx.tool_name, op),
            None => format!("'{}' requires approval", ctx.tool_name),
        };
        debug!(thread_id = %ctx.thread_id, tool = %ctx.tool_name, reason = %reason, "call gated");
        ApprovalVerdict::RequireApproval { reason }
    }
}
