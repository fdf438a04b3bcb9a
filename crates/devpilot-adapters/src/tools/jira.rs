//! The `jira_info` tool: issue search over the Jira REST API.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use devpilot_contracts::message::Arguments;
use devpilot_core::traits::ToolAdapter;

use crate::error::{AdapterError, AdapterResult};

use super::string_arg;

pub const ENV_INSTANCE_URL: &str = "JIRA_INSTANCE_URL";
pub const ENV_USERNAME: &str = "JIRA_USERNAME";
pub const ENV_API_TOKEN: &str = "JIRA_API_TOKEN";

const MAX_RESULTS: usize = 10;

#[derive(Clone)]
pub struct JiraConfig {
    pub instance_url: String,
    pub username: String,
    pub api_token: String,
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("instance_url", &self.instance_url)
            .field("username", &self.username)
            .field("api_token", &"***")
            .finish()
    }
}

impl JiraConfig {
    pub fn from_env() -> AdapterResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AdapterResult<Self> {
        let var = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AdapterError::MissingEnv {
                    name: name.to_string(),
                })
        };
        Ok(Self {
            instance_url: var(ENV_INSTANCE_URL)?,
            username: var(ENV_USERNAME)?,
            api_token: var(ENV_API_TOKEN)?,
        })
    }
}

pub struct JiraTool {
    client: reqwest::Client,
    /// `Err` holds the reason the tool is not configured.
    config: Result<JiraConfig, String>,
}

impl JiraTool {
    pub fn new(config: JiraConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: Ok(config),
        }
    }

    /// Configure from the environment. Missing variables do not fail
    /// construction; every call reports them instead.
    pub fn from_env() -> Self {
        match JiraConfig::from_env() {
            Ok(config) => Self::new(config),
            Err(e) => {
                warn!(error = %e, "jira_info is not configured");
                Self {
                    client: reqwest::Client::new(),
                    config: Err(e.to_string()),
                }
            }
        }
    }

    async fn search(&self, config: &JiraConfig, query: &str) -> AdapterResult<String> {
        let url = format!("{}/rest/api/2/search", config.instance_url.trim_end_matches('/'));
        let jql = to_jql(query);
        let max_results = MAX_RESULTS.to_string();
        info!(jql = %jql, "searching jira");

        let body: Value = self
            .client
            .get(&url)
            .basic_auth(&config.username, Some(&config.api_token))
            .query(&[
                ("jql", jql.as_str()),
                ("maxResults", max_results.as_str()),
                ("fields", "summary,status,assignee,priority"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(render_issues(&body))
    }
}

/// Queries that already look like JQL pass through; anything else becomes a
/// text search.
pub fn to_jql(query: &str) -> String {
    let looks_like_jql = ["=", "~", " ORDER BY ", " order by "]
        .iter()
        .any(|marker| query.contains(marker));
    if looks_like_jql {
        query.to_string()
    } else {
        format!("text ~ \"{}\" ORDER BY updated DESC", query.replace('"', "\\\""))
    }
}

/// One line per issue: `KEY [status] summary (assignee, priority)`.
pub fn render_issues(body: &Value) -> String {
    let issues = body["issues"].as_array().map(Vec::as_slice).unwrap_or_default();
    if issues.is_empty() {
        return "No Jira issues matched the query.".to_string();
    }
    let field = |issue: &Value, path: &[&str]| {
        path.iter()
            .try_fold(&issue["fields"], |v, key| v.get(*key))
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string()
    };
    issues
        .iter()
        .map(|issue| {
            format!(
                "{} [{}] {} ({}, {})",
                issue["key"].as_str().unwrap_or("?"),
                field(issue, &["status", "name"]),
                field(issue, &["summary"]),
                field(issue, &["assignee", "displayName"]),
                field(issue, &["priority", "name"]),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ToolAdapter for JiraTool {
    async fn invoke(&self, arguments: &Arguments) -> String {
        let config = match &self.config {
            Ok(config) => config,
            Err(reason) => return format!("Error retrieving Jira Info: {reason}"),
        };
        let Some(query) = string_arg(arguments, "query") else {
            return "Error retrieving Jira Info: missing 'query' argument".to_string();
        };
        match self.search(config, query).await {
            Ok(result) => result,
            Err(e) => format!("Error retrieving Jira Info: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_plain_text_becomes_text_search() {
        assert_eq!(
            to_jql("payment \"timeout\""),
            "text ~ \"payment \\\"timeout\\\"\" ORDER BY updated DESC"
        );
    }

    #[test]
    fn test_jql_passes_through() {
        let jql = "project = OPS AND status = \"In Progress\"";
        assert_eq!(to_jql(jql), jql);
    }

    #[test]
    fn test_render_issues() {
        let body = json!({
            "issues": [
                {
                    "key": "OPS-12",
                    "fields": {
                        "summary": "Rotate ingress certificates",
                        "status": { "name": "In Progress" },
                        "assignee": { "displayName": "Sam" },
                        "priority": { "name": "High" }
                    }
                },
                { "key": "OPS-13", "fields": { "summary": "Bump helm chart" } }
            ]
        });
        assert_eq!(
            render_issues(&body),
            "OPS-12 [In Progress] Rotate ingress certificates (Sam, High)\n\
             OPS-13 [-] Bump helm chart (-, -)"
        );
    }

    #[test]
    fn test_render_empty_result() {
        assert_eq!(render_issues(&json!({ "issues": [] })), "No Jira issues matched the query.");
    }

    #[test]
    fn test_config_reports_first_missing_variable() {
        let vars: HashMap<&str, &str> = [(ENV_INSTANCE_URL, "https://jira.example.com")].into();
        let err = JiraConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        assert_eq!(err.to_string(), "JIRA_USERNAME environment variable not set");
    }

    #[tokio::test]
    async fn test_unconfigured_tool_reports_reason() {
        let tool = JiraTool {
            client: reqwest::Client::new(),
            config: Err("JIRA_INSTANCE_URL environment variable not set".to_string()),
        };
        let args = json!({ "query": "open incidents" }).as_object().cloned().unwrap();
        assert_eq!(
            tool.invoke(&args).await,
            "Error retrieving Jira Info: JIRA_INSTANCE_URL environment variable not set"
        );
    }
}
