//! Runtime configuration for the orchestration graph.
//!
//! Configuration is plain TOML. Every key is optional; omitted keys take the
//! defaults below.
//!
//! ```toml
//! summary_threshold = 25
//! keep_after_summary = 10
//! tool_timeout_secs = 120
//! model_timeout_secs = 120
//! max_steps = 25
//! emit_tool_calls = ["kubectl_exec", "docker_exec"]
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use devpilot_contracts::error::{DevpilotError, DevpilotResult};

use crate::prompt::SYSTEM_PROMPT;

/// Environment override for `summary_threshold`.
pub const ENV_HISTORY_LIMIT: &str = "MESSAGE_HISTORY_LIMIT";
/// Environment override for `keep_after_summary`.
pub const ENV_HISTORY_LIMIT_AFTER_SUMMARY: &str = "MESSAGE_HISTORY_LIMIT_AFTER_SUMMARY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Compaction runs once the transcript is longer than this.
    pub summary_threshold: usize,
    /// Messages retained verbatim after compaction (plus one if the window
    /// would otherwise start on a tool result).
    pub keep_after_summary: usize,
    pub tool_timeout_secs: u64,
    pub model_timeout_secs: u64,
    /// Node visits allowed in a single execution.
    pub max_steps: usize,
    /// Used when the thread has no summary yet.
    pub system_prompt: String,
    /// Tools whose proposed calls are broadcast for operator preview.
    pub emit_tool_calls: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            summary_threshold: 25,
            keep_after_summary: 10,
            tool_timeout_secs: 120,
            model_timeout_secs: 120,
            max_steps: 25,
            system_prompt: SYSTEM_PROMPT.to_string(),
            emit_tool_calls: [
                "git_exec",
                "file_manage",
                "docker_exec",
                "gcloud_exec",
                "helm_exec",
                "kubectl_exec",
                "aws_exec",
                "azure_exec",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl AgentConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the TOML is malformed or a value is out of range.
    pub fn from_toml_str(toml_str: &str) -> DevpilotResult<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| DevpilotError::ConfigError {
            reason: format!("failed to parse agent config TOML: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> DevpilotResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DevpilotError::ConfigError {
            reason: format!("cannot read config file '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `MESSAGE_HISTORY_LIMIT` and `MESSAGE_HISTORY_LIMIT_AFTER_SUMMARY`
    /// from the process environment.
    pub fn with_env_overrides(self) -> DevpilotResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply history-limit overrides from `lookup`, then re-validate.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> DevpilotResult<Self> {
        if let Some(raw) = lookup(ENV_HISTORY_LIMIT) {
            self.summary_threshold = parse_limit(ENV_HISTORY_LIMIT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HISTORY_LIMIT_AFTER_SUMMARY) {
            self.keep_after_summary = parse_limit(ENV_HISTORY_LIMIT_AFTER_SUMMARY, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the graph cannot run with.
    pub fn validate(&self) -> DevpilotResult<()> {
        if self.keep_after_summary == 0 {
            return Err(config_error("keep_after_summary must be at least 1"));
        }
        if self.keep_after_summary >= self.summary_threshold {
            return Err(config_error(format!(
                "keep_after_summary ({}) must be smaller than summary_threshold ({})",
                self.keep_after_summary, self.summary_threshold
            )));
        }
        if self.tool_timeout_secs == 0 || self.model_timeout_secs == 0 {
            return Err(config_error("timeouts must be at least one second"));
        }
        if self.max_steps == 0 {
            return Err(config_error("max_steps must be at least 1"));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn emits(&self, tool_name: &str) -> bool {
        self.emit_tool_calls.iter().any(|t| t == tool_name)
    }
}

fn parse_limit(key: &str, raw: &str) -> DevpilotResult<usize> {
    raw.trim()
        .parse()
        .map_err(|_| config_error(format!("{key} must be a positive integer, got '{raw}'")))
}

fn config_error(reason: impl Into<String>) -> DevpilotError {
    DevpilotError::ConfigError {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AgentConfig::from_toml_str("").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.summary_threshold, 25);
        assert_eq!(config.keep_after_summary, 10);
        assert!(config.emits("kubectl_exec"));
        assert!(!config.emits("docker_retrieval"));
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = AgentConfig::from_toml_str("summary_threshold = 8\nkeep_after_summary = 3").unwrap();
        assert_eq!(config.summary_threshold, 8);
        assert_eq!(config.keep_after_summary, 3);
        assert_eq!(config.max_steps, 25);
        assert!(config.system_prompt.starts_with("You are DevOpsGPT"));
    }

    #[test]
    fn keep_must_be_below_threshold() {
        let err = AgentConfig::from_toml_str("summary_threshold = 5\nkeep_after_summary = 5").unwrap_err();
        assert!(matches!(err, DevpilotError::ConfigError { .. }));
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = AgentConfig::from_toml_str("summary_threshold = [").unwrap_err();
        match err {
            DevpilotError::ConfigError { reason } => {
                assert!(reason.contains("failed to parse agent config TOML"));
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn overrides_replace_history_limits() {
        let config = AgentConfig::default()
            .with_overrides(|key| match key {
                ENV_HISTORY_LIMIT => Some("40".to_string()),
                ENV_HISTORY_LIMIT_AFTER_SUMMARY => Some("12".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.summary_threshold, 40);
        assert_eq!(config.keep_after_summary, 12);
    }

    #[test]
    fn non_numeric_override_is_rejected() {
        let err = AgentConfig::default()
            .with_overrides(|key| (key == ENV_HISTORY_LIMIT).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_HISTORY_LIMIT));
    }

    #[test]
    fn shipped_sample_matches_defaults() {
        let sample = include_str!("../../../config/devpilot.toml");
        let config = AgentConfig::from_toml_str(sample).unwrap();
        assert_eq!(config, AgentConfig::default());
    }
}
