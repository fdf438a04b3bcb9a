//! Canned adapters and documents for the demo scenarios.
//!
//! Nothing here touches a real cluster, filesystem, or network. The
//! recording tool stands in for any CLI wrapper and remembers every call it
//! receives, which is how the scenarios show that a denied call never ran.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map};

use devpilot_contracts::{
    message::{Arguments, ToolCall},
    tool::ToolSpec,
};
use devpilot_core::{registry::ToolRegistry, traits::ToolAdapter};

use crate::tools::retrieval::{Document, KeywordRetriever, RetrievalTool};

// ── Recording tool ────────────────────────────────────────────────────────────

/// Returns a fixed output and records the arguments of every invocation.
#[derive(Clone)]
pub struct RecordingTool {
    output: String,
    calls: Arc<Mutex<Vec<Arguments>>>,
}

impl RecordingTool {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            calls: Arc::default(),
        }
    }

    pub fn invocations(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn last_arguments(&self) -> Option<Arguments> {
        self.calls.lock().ok().and_then(|c| c.last().cloned())
    }
}

#[async_trait]
impl ToolAdapter for RecordingTool {
    async fn invoke(&self, arguments: &Arguments) -> String {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(arguments.clone());
        }
        self.output.clone()
    }
}

// ── Cluster output ────────────────────────────────────────────────────────────

pub const KUBECTL_DELETE_OUTPUT: &str = "deployment.apps \"web\" deleted\n";

pub const KUBECTL_GET_PODS_OUTPUT: &str = "\
NAME                   READY   STATUS    RESTARTS   AGE
web-7d4b9c6f5d-2xkqp   1/1     Running   0          3d
web-7d4b9c6f5d-9vl8m   1/1     Running   0          3d
worker-5f8d7b9c-hh2tn  1/1     Running   2          1d
";

pub fn kubectl_call(id: &str, command: &str) -> ToolCall {
    ToolCall::new(id, "kubectl_exec", command_args(command))
}

pub fn command_args(command: &str) -> Arguments {
    let mut args = Map::new();
    args.insert("command".to_string(), json!(command));
    args
}

// ── Docker best-practice corpus ───────────────────────────────────────────────

fn doc(source: &str, section: &str, content: &str) -> Document {
    let mut metadata = Map::new();
    metadata.insert("source".to_string(), json!(source));
    metadata.insert("section".to_string(), json!(section));
    Document {
        content: content.to_string(),
        metadata,
    }
}

pub fn docker_corpus() -> KeywordRetriever {
    KeywordRetriever::new(vec![
        doc(
            "dockerfile_best_practices.md",
            "Multi-stage builds",
            "Use multi-stage builds so the final image carries only the runtime \
             and compiled artifacts, not the build toolchain.",
        ),
        doc(
            "dockerfile_best_practices.md",
            "Base images",
            "Pin base image tags to a digest and prefer slim or distroless images \
             to reduce the attack surface of the docker image.",
        ),
        doc(
            "helm_and_docker.md",
            "Image pull policy",
            "In Kubernetes, set imagePullPolicy to IfNotPresent for pinned tags.",
        ),
    ])
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Register every spec with a fixture adapter: `kubectl_exec` gets `kubectl`,
/// retrieval tools search `docker_corpus`, and everything else answers "ok".
pub fn fixture_registry(specs: &[ToolSpec], kubectl: &RecordingTool) -> ToolRegistry {
    let corpus = Arc::new(docker_corpus());
    let mut registry = ToolRegistry::new();
    for spec in specs {
        let adapter: Arc<dyn ToolAdapter> = if spec.name == "kubectl_exec" {
            Arc::new(kubectl.clone())
        } else if spec.retrieval {
            Arc::new(RetrievalTool::new("Docker", corpus.clone()))
        } else {
            Arc::new(RecordingTool::new("ok"))
        };
        registry.register(spec.clone(), adapter);
    }
    registry
}
