//! Schema-based argument verifier.
//!
//! `SchemaArgumentVerifier` implements the `ArgumentVerifier` trait from
//! `devpilot-core`. Verification runs in two phases:
//!
//! 1. **Structural**: the call's arguments are validated against the tool's
//!    `parameters` document using the `jsonschema` crate.
//! 2. **Custom**: each rule registered for the tool is evaluated in
//!    registration order.
//!
//! All failures are collected before returning, so the model sees the full
//! failure set in the tool result it gets back.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    message::Arguments,
    tool::ToolSpec,
    verify::{ArgumentFailure, ArgumentReport},
};
use devpilot_core::traits::ArgumentVerifier;

/// A caller-supplied argument check.
///
/// Returns `Some(message)` when the arguments are unacceptable, `None` when
/// they pass.
pub type ArgumentRuleFn = Box<dyn Fn(&Arguments) -> Option<String> + Send + Sync>;

struct ArgumentRule {
    rule_id: String,
    check: ArgumentRuleFn,
}

/// The devpilot argument verifier.
#[derive(Default)]
pub struct SchemaArgumentVerifier {
    /// Rules keyed by tool name.
    rules: HashMap<String, Vec<ArgumentRule>>,
}

impl SchemaArgumentVerifier {
    /// Create a verifier with no custom rules registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom rule for `tool`.
    ///
    /// Registering the same `rule_id` twice for a tool replaces the earlier
    /// function and keeps its position.
    pub fn register_rule(
        &mut self,
        tool: impl Into<String>,
        rule_id: impl Into<String>,
        check: ArgumentRuleFn,
    ) {
        let rule_id = rule_id.into();
        let rules = self.rules.entry(tool.into()).or_default();
        match rules.iter_mut().find(|r| r.rule_id == rule_id) {
            Some(existing) => existing.check = check,
            None => rules.push(ArgumentRule { rule_id, check }),
        }
    }

    /// Number of custom rules registered for `tool`.
    pub fn rule_count(&self, tool: &str) -> usize {
        self.rules.get(tool).map(Vec::len).unwrap_or(0)
    }
}

impl ArgumentVerifier for SchemaArgumentVerifier {
    /// Verify `arguments` against `spec`.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the tool's `parameters` is not a valid JSON Schema.
    /// That is a catalog mistake, not a bad call, so it is not folded into
    /// the report.
    fn verify(&self, spec: &ToolSpec, arguments: &Arguments) -> DevpilotResult<ArgumentReport> {
        let mut failures: Vec<ArgumentFailure> = Vec::new();

        // ── Phase 1: JSON Schema structural validation ────────────────────────
        // Null parameters means the tool accepts any arguments object.
        if !spec.parameters.is_null() {
            let validator = jsonschema::validator_for(&spec.parameters).map_err(|e| {
                DevpilotError::ConfigError {
                    reason: format!("tool '{}' has an invalid parameters schema: {}", spec.name, e),
                }
            })?;

            let instance = Value::Object(arguments.clone());
            for error in validator.iter_errors(&instance) {
                let path = error.instance_path.to_string();
                let message = if path.is_empty() {
                    error.to_string()
                } else {
                    format!("at {}: {}", path, error)
                };
                warn!(tool = %spec.name, %message, "argument schema violation");
                failures.push(ArgumentFailure {
                    rule_id: "json-schema".to_string(),
                    message,
                });
            }
        }

        // ── Phase 2: Custom rules ────────────────────────────────────────────
        for rule in self.rules.get(&spec.name).into_iter().flatten() {
            debug!(tool = %spec.name, rule_id = %rule.rule_id, "evaluating argument rule");
            if let Some(message) = (rule.check)(arguments) {
                warn!(tool = %spec.name, rule_id = %rule.rule_id, %message, "argument rule failed");
                failures.push(ArgumentFailure {
                    rule_id: rule.rule_id.clone(),
                    message,
                });
            }
        }

        let passed = failures.is_empty();
        debug!(
            tool = %spec.name,
            passed,
            failure_count = failures.len(),
            "argument verification complete"
        );

        Ok(ArgumentReport { passed, failures })
    }
}

/// A rule that fails when the string argument `field` contains `pattern`.
/// Absent or non-string fields pass.
pub fn forbid_substring(field: impl Into<String>, pattern: impl Into<String>) -> ArgumentRuleFn {
    let field = field.into();
    let pattern = pattern.into();
    Box::new(move |arguments| {
        let value = arguments.get(&field)?.as_str()?;
        value
            .contains(pattern.as_str())
            .then(|| format!("argument '{field}' contains forbidden pattern '{pattern}'"))
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use devpilot_contracts::{error::DevpilotError, message::Arguments, tool::ToolSpec};
    use devpilot_core::traits::ArgumentVerifier;

    use super::{forbid_substring, SchemaArgumentVerifier};

    // ── Builder helpers ───────────────────────────────────────────────────────

    fn command_tool() -> ToolSpec {
        let mut spec = ToolSpec::new("kubectl_exec", "Execute Kubernetes commands");
        spec.parameters = json!({
            "type": "object",
            "properties": { "command": { "type": "string" } },
            "required": ["command"]
        });
        spec
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    // ── JSON Schema tests ─────────────────────────────────────────────────────

    #[test]
    fn test_schema_pass() {
        let verifier = SchemaArgumentVerifier::new();
        let report = verifier
            .verify(&command_tool(), &args(json!({ "command": "get pods" })))
            .unwrap();

        assert!(report.passed, "expected pass, failures: {:?}", report.failures);
        assert!(report.failures.is_empty());
    }

    /// A call missing a required argument fails with a json-schema failure.
    #[test]
    fn test_schema_missing_required() {
        let verifier = SchemaArgumentVerifier::new();
        let report = verifier
            .verify(&command_tool(), &args(json!({ "cmd": "get pods" })))
            .unwrap();

        assert!(!report.passed, "expected failure for missing command");
        assert_eq!(report.failures[0].rule_id, "json-schema");
        assert!(
            report.failures[0].message.contains("command"),
            "failure should name the missing argument: {}",
            report.failures[0].message
        );
    }

    #[test]
    fn test_schema_wrong_type_names_path() {
        let verifier = SchemaArgumentVerifier::new();
        let report = verifier
            .verify(&command_tool(), &args(json!({ "command": 42 })))
            .unwrap();

        assert!(!report.passed);
        assert!(
            report.failures[0].message.contains("/command"),
            "failure should carry the instance path: {}",
            report.failures[0].message
        );
    }

    #[test]
    fn test_null_parameters_accept_anything() {
        let verifier = SchemaArgumentVerifier::new();
        let spec = ToolSpec::new("free_form", "anything goes");
        let report = verifier.verify(&spec, &args(json!({ "x": [1, 2] }))).unwrap();
        assert!(report.passed);
    }

    /// A malformed schema is a catalog error, not a failed call.
    #[test]
    fn test_invalid_schema_is_config_error() {
        let verifier = SchemaArgumentVerifier::new();
        let mut spec = command_tool();
        spec.parameters = json!({ "type": "not-a-type" });

        match verifier.verify(&spec, &args(json!({ "command": "get pods" }))) {
            Err(DevpilotError::ConfigError { reason }) => {
                assert!(reason.contains("kubectl_exec"), "unexpected reason: {reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    // ── Custom rule tests ─────────────────────────────────────────────────────

    #[test]
    fn test_custom_rule_fail() {
        let mut verifier = SchemaArgumentVerifier::new();
        verifier.register_rule(
            "kubectl_exec",
            "no-all-namespaces",
            forbid_substring("command", "--all-namespaces"),
        );

        let report = verifier
            .verify(
                &command_tool(),
                &args(json!({ "command": "delete pods --all-namespaces" })),
            )
            .unwrap();

        assert!(!report.passed);
        assert_eq!(report.failures[0].rule_id, "no-all-namespaces");
        assert!(report.summary().contains("--all-namespaces"));
    }

    /// Rules registered for one tool never apply to another.
    #[test]
    fn test_custom_rule_scoped_to_tool() {
        let mut verifier = SchemaArgumentVerifier::new();
        verifier.register_rule("helm_exec", "always-fail", Box::new(|_| Some("nope".to_string())));

        let report = verifier
            .verify(&command_tool(), &args(json!({ "command": "get pods" })))
            .unwrap();
        assert!(report.passed);
    }

    /// Schema and custom failures are reported together.
    #[test]
    fn test_failures_accumulate() {
        let mut verifier = SchemaArgumentVerifier::new();
        verifier.register_rule(
            "kubectl_exec",
            "needs-namespace",
            Box::new(|a| (!a.contains_key("namespace")).then(|| "namespace is required".to_string())),
        );

        let report = verifier.verify(&command_tool(), &args(json!({}))).unwrap();

        assert!(!report.passed);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].rule_id, "json-schema");
        assert_eq!(report.failures[1].rule_id, "needs-namespace");
    }

    #[test]
    fn test_reregistering_replaces_rule() {
        let mut verifier = SchemaArgumentVerifier::new();
        verifier.register_rule("kubectl_exec", "gate", Box::new(|_| Some("old".to_string())));
        verifier.register_rule("kubectl_exec", "gate", Box::new(|_| None));

        assert_eq!(verifier.rule_count("kubectl_exec"), 1);
        let report = verifier
            .verify(&command_tool(), &args(json!({ "command": "get pods" })))
            .unwrap();
        assert!(report.passed);
    }

    #[test]
    fn test_forbid_substring_ignores_non_strings() {
        let rule = forbid_substring("command", "rm");
        assert!(rule(&args(json!({ "command": 7 }))).is_none());
        assert!(rule(&args(json!({}))).is_none());
        assert!(rule(&args(json!({ "command": "rm -rf /" }))).is_some());
    }
}
