//! Scenario 3: Retrieval digest
//!
//! The operator asks how to shrink an image. The model calls
//! `docker_retrieval`, which needs no approval. The raw documents are handed
//! to a second, tool-free model call, and only that digest enters the
//! transcript and the progress log.

use serde_json::json;

use devpilot_contracts::{
    error::DevpilotResult,
    message::{Message, ToolCall},
};
use devpilot_core::AgentConfig;

use crate::fixtures::KUBECTL_GET_PODS_OUTPUT;

use super::{outcome_name, ScenarioSummary, Workbench};

pub const DIGEST: &str = "Use multi-stage builds and pin slim base images to keep docker images small.";

pub async fn run_scenario() -> DevpilotResult<ScenarioSummary> {
    println!("=== Scenario 3: Retrieval digest ===");
    println!();

    let mut arguments = serde_json::Map::new();
    arguments.insert("query".to_string(), json!("docker image multi-stage builds"));

    let bench = Workbench::new(
        vec![
            Message::assistant_with_calls("", vec![ToolCall::new("call_docs", "docker_retrieval", arguments)]),
            Message::assistant(DIGEST),
            Message::assistant("Switch to a multi-stage Dockerfile on a slim base image."),
        ],
        KUBECTL_GET_PODS_OUTPUT,
        AgentConfig::default(),
    )?;

    println!("  Request:  how do I make our docker image smaller?");
    let outcome = bench
        .engine
        .invoke(&bench.thread, Message::human("how do I make our docker image smaller?"))
        .await?;

    let state = outcome.state();
    if let Some(entry) = state.logs.last() {
        println!("  Log entry: {} ({})", entry.message, entry.description);
        println!("  Digest:    {}", entry.result);
    }
    println!("  Summarization passes: {}", bench.model.text_only_requests());
    println!("  Outcome:  {}", outcome_name(&outcome));
    println!();

    Ok(bench.finish("retrieval-summary", &outcome))
}

#[cfg(test)]
mod tests {
    use devpilot_core::traits::ToolChoice;

    use super::*;

    #[tokio::test]
    async fn test_digest_replaces_raw_documents() {
        let summary = run_scenario().await.unwrap();
        assert_eq!(summary.outcome, "completed");
        assert_eq!(summary.logs, 1);
    }

    #[tokio::test]
    async fn test_digest_request_carries_retrieved_sources() {
        let mut arguments = serde_json::Map::new();
        arguments.insert("query".to_string(), json!("multi-stage builds"));
        let bench = Workbench::new(
            vec![
                Message::assistant_with_calls("", vec![ToolCall::new("c1", "docker_retrieval", arguments)]),
                Message::assistant(DIGEST),
                Message::assistant("done"),
            ],
            KUBECTL_GET_PODS_OUTPUT,
            AgentConfig::default(),
        )
        .unwrap();

        let outcome = bench.engine.invoke(&bench.thread, Message::human("smaller images?")).await.unwrap();

        let state = outcome.state();
        assert_eq!(state.logs[0].result, DIGEST);
        assert!(state.logs[0].done);
        assert_eq!(state.messages[2].content, DIGEST);

        let requests = bench.model.requests();
        assert_eq!(requests[1].tool_choice, ToolChoice::None);
        assert!(requests[1].messages[0]
            .content
            .contains("Source: {\"section\":\"Multi-stage builds\",\"source\":\"dockerfile_best_practices.md\"}"));
    }
}
