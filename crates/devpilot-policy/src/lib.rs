//! # devpilot-policy
//!
//! The TOML tool catalog and the approval policy built on it.
//!
//! ## Overview
//!
//! [`CatalogApprovalPolicy`] implements
//! [`ApprovalPolicy`](devpilot_core::traits::ApprovalPolicy). The same
//! catalog also supplies the `ToolSpec`s registered with the engine, so the
//! model sees exactly the tools the policy knows about.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use devpilot_policy::CatalogApprovalPolicy;
//!
//! let policy = CatalogApprovalPolicy::builtin()?;
//! // Pass `Arc::new(policy)` to `devpilot_core::GraphEngine::new(...)`.
//! ```

pub mod catalog;
pub mod engine;

pub use catalog::{ApprovalSettings, GateMode, ToolCatalog};
pub use engine::{CatalogApprovalPolicy, BUILTIN_CATALOG};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use devpilot_contracts::{
        error::DevpilotError,
        policy::{ApprovalContext, ApprovalVerdict},
        state::AutoApprove,
    };
    use devpilot_core::traits::ApprovalPolicy;

    use crate::{CatalogApprovalPolicy, GateMode};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn ctx(tool: &str, operation: Option<&str>, auto_approve: AutoApprove) -> ApprovalContext {
        ApprovalContext {
            thread_id: "t-policy".to_string(),
            tool_name: tool.to_string(),
            operation: operation.map(str::to_string),
            auto_approve,
        }
    }

    const KUBECTL_ONLY: &str = r#"
        [[tools]]
        name = "kubectl_exec"
        description = "Execute Kubernetes commands"
        requires_approval = true
        dangerous_operations = ["delete", "apply"]

        [[tools]]
        name = "jira_info"
        description = "Get information from Jira"
    "#;

    // ── 1. tool gate ──────────────────────────────────────────────────────────

    /// The default gate pauses every call to an approval-requiring tool,
    /// read-only operations included.
    #[test]
    fn test_tool_gate_pauses_every_call() {
        let policy = CatalogApprovalPolicy::from_toml_str(KUBECTL_ONLY).unwrap();
        assert_eq!(policy.gate(), GateMode::Tool);

        match policy.evaluate(&ctx("kubectl_exec", Some("get"), AutoApprove::No)) {
            ApprovalVerdict::RequireApproval { reason } => {
                assert_eq!(reason, "'kubectl_exec' requires approval");
            }
            other => panic!("expected RequireApproval, got {:?}", other),
        }
    }

    #[test]
    fn test_reason_names_dangerous_operation() {
        let policy = CatalogApprovalPolicy::from_toml_str(KUBECTL_ONLY).unwrap();

        match policy.evaluate(&ctx("kubectl_exec", Some("delete"), AutoApprove::No)) {
            ApprovalVerdict::RequireApproval { reason } => {
                assert!(reason.contains("operation 'delete'"), "unexpected reason: {reason}");
            }
            other => panic!("expected RequireApproval, got {:?}", other),
        }
    }

    // ── 2. auto-approve and ungated tools ─────────────────────────────────────

    #[test]
    fn test_auto_approve_allows_everything() {
        let policy = CatalogApprovalPolicy::from_toml_str(KUBECTL_ONLY).unwrap();
        assert_eq!(
            policy.evaluate(&ctx("kubectl_exec", Some("delete"), AutoApprove::Yes)),
            ApprovalVerdict::Allow
        );
    }

    #[test]
    fn test_ungated_and_unknown_tools_are_allowed() {
        let policy = CatalogApprovalPolicy::from_toml_str(KUBECTL_ONLY).unwrap();
        assert_eq!(
            policy.evaluate(&ctx("jira_info", None, AutoApprove::No)),
            ApprovalVerdict::Allow
        );
        assert_eq!(
            policy.evaluate(&ctx("terraform_exec", Some("apply"), AutoApprove::No)),
            ApprovalVerdict::Allow
        );
    }

    // ── 3. operation gate ─────────────────────────────────────────────────────

    #[test]
    fn test_operation_gate_only_pauses_dangerous_operations() {
        let toml = r#"
            [approval]
            gate = "operation"

            [[tools]]
            name = "kubectl_exec"
            description = "Execute Kubernetes commands"
            requires_approval = true
            dangerous_operations = ["delete"]

            [[tools]]
            name = "gcloud_exec"
            description = "Execute Google Cloud commands"
            requires_approval = true
        "#;
        let policy = CatalogApprovalPolicy::from_toml_str(toml).unwrap();

        assert_eq!(
            policy.evaluate(&ctx("kubectl_exec", Some("get"), AutoApprove::No)),
            ApprovalVerdict::Allow
        );
        assert!(matches!(
            policy.evaluate(&ctx("kubectl_exec", Some("delete"), AutoApprove::No)),
            ApprovalVerdict::RequireApproval { .. }
        ));

        // No classified operations: every call still pauses.
        assert!(matches!(
            policy.evaluate(&ctx("gcloud_exec", Some("projects"), AutoApprove::No)),
            ApprovalVerdict::RequireApproval { .. }
        ));
    }

    // ── 4. built-in catalog ───────────────────────────────────────────────────

    #[test]
    fn test_builtin_catalog_loads() {
        let policy = CatalogApprovalPolicy::builtin().unwrap();
        let names: Vec<&str> = policy.specs().iter().map(|s| s.name.as_str()).collect();

        assert_eq!(names.len(), 15);
        assert_eq!(names[0], "kubectl_exec");
        for gated in ["kubectl_exec", "docker_exec", "git_exec", "helm_exec", "file_manage", "aws_exec", "azure_exec"] {
            assert!(policy.catalog().get(gated).unwrap().requires_approval, "{gated} must be gated");
        }
        let retrieval: Vec<&str> = policy
            .specs()
            .iter()
            .filter(|s| s.retrieval)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            retrieval,
            vec!["docker_retrieval", "bq_retrieval", "confluence_retrieval", "aws_retrieval"]
        );

        let kubectl = policy.catalog().get("kubectl_exec").unwrap();
        assert_eq!(kubectl.parameters["required"][0], "command");
        assert!(kubectl.is_dangerous("scale"));
    }

    // ── 5. config errors ──────────────────────────────────────────────────────

    #[test]
    fn test_toml_parse_error() {
        let result = CatalogApprovalPolicy::from_toml_str("this is not valid toml ][[[");

        match result {
            Err(DevpilotError::ConfigError { reason }) => {
                assert!(
                    reason.contains("failed to parse tool catalog TOML"),
                    "expected parse error message, got: {reason}"
                );
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_tool_rejected() {
        let toml = r#"
            [[tools]]
            name = "git_exec"
            description = "Execute Git commands"

            [[tools]]
            name = "git_exec"
            description = "Execute Git commands again"
        "#;
        assert!(matches!(
            CatalogApprovalPolicy::from_toml_str(toml),
            Err(DevpilotError::ConfigError { .. })
        ));
    }
}
