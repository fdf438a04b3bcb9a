//! Pair the tool catalog with adapters.
//!
//! The policy crate's catalog says what each tool is; this module decides
//! what runs when it is called. Every catalog entry must have an adapter.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, warn};

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    tool::ToolSpec,
};
use devpilot_core::{registry::ToolRegistry, traits::ToolAdapter};

use crate::{
    error::{AdapterError, AdapterResult},
    tools::{
        retrieval::{Document, DocumentRetriever, KeywordRetriever, RetrievalTool},
        CliTool, FileManageTool, JiraTool,
    },
};

/// Environment-dependent inputs for the built-in adapters.
#[derive(Debug, Clone, Default)]
pub struct AdapterSettings {
    /// Root of the retrieval corpora: one subdirectory of markdown files
    /// per corpus (`docker/`, `bigquery/`, `confluence/`, `aws/`).
    pub corpus_dir: Option<PathBuf>,
    /// Managed identity used by `azure_exec`.
    pub azure_client_id: Option<String>,
}

impl AdapterSettings {
    pub fn from_env() -> Self {
        Self {
            corpus_dir: std::env::var("DEVPILOT_CORPUS_DIR").ok().map(PathBuf::from),
            azure_client_id: std::env::var("AZURE_CLIENT_ID").ok().filter(|v| !v.is_empty()),
        }
    }
}

/// Build a registry holding every tool in `specs`, in catalog order.
///
/// # Errors
///
/// `ConfigError` when a catalog entry names a tool with no built-in adapter.
pub fn builtin_registry(specs: &[ToolSpec], settings: &AdapterSettings) -> DevpilotResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for spec in specs {
        let adapter = builtin_adapter(&spec.name, settings).ok_or_else(|| DevpilotError::ConfigError {
            reason: format!("no built-in adapter for tool '{}'", spec.name),
        })?;
        registry.register(spec.clone(), adapter);
    }
    debug!(tools = registry.len(), "built-in registry assembled");
    Ok(registry)
}

fn builtin_adapter(name: &str, settings: &AdapterSettings) -> Option<Arc<dyn ToolAdapter>> {
    let adapter: Arc<dyn ToolAdapter> = match name {
        "kubectl_exec" => Arc::new(CliTool::new("kubectl")),
        "docker_exec" => Arc::new(CliTool::new("docker")),
        "git_exec" => Arc::new(CliTool::new("git")),
        "helm_exec" => Arc::new(CliTool::new("helm")),
        "gcloud_exec" => Arc::new(CliTool::new("gcloud")),
        "gsutil_exec" => Arc::new(CliTool::new("gsutil")),
        "bq_exec" => Arc::new(CliTool::bq()),
        "aws_exec" => Arc::new(CliTool::aws()),
        "azure_exec" => Arc::new(CliTool::azure(settings.azure_client_id.clone())),
        "file_manage" => Arc::new(FileManageTool::new()),
        "jira_info" => Arc::new(JiraTool::from_env()),
        "docker_retrieval" => retrieval("Docker", "docker", settings),
        "bq_retrieval" => retrieval("BigQuery", "bigquery", settings),
        "confluence_retrieval" => retrieval("confluence", "confluence", settings),
        "aws_retrieval" => retrieval("AWS", "aws", settings),
        _ => return None,
    };
    Some(adapter)
}

fn retrieval(label: &str, corpus: &str, settings: &AdapterSettings) -> Arc<dyn ToolAdapter> {
    let retriever: Arc<dyn DocumentRetriever> = match &settings.corpus_dir {
        Some(root) => {
            let dir = root.join(corpus);
            match KeywordRetriever::from_dir(&dir) {
                Ok(retriever) => Arc::new(retriever),
                Err(e) => {
                    warn!(corpus, error = %e, "retrieval corpus unavailable");
                    Arc::new(Unavailable(e.to_string()))
                }
            }
        }
        None => Arc::new(Unavailable(format!("no corpus directory configured for '{corpus}'"))),
    };
    Arc::new(RetrievalTool::new(label, retriever))
}

/// Stands in for a corpus that failed to load; every query reports why.
struct Unavailable(String);

#[async_trait]
impl DocumentRetriever for Unavailable {
    async fn retrieve(&self, _query: &str, _k: usize) -> AdapterResult<Vec<Document>> {
        Err(AdapterError::Corpus {
            reason: self.0.clone(),
        })
    }
}
