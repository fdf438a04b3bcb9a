//! Demo scenarios.
//!
//! Each scenario wires the real runtime components (catalog policy, schema
//! verifier, hash-chained checkpoint store, graph engine) to a scripted model
//! and fixture adapters, then walks one flow end to end:
//!
//! 1. **Deny delete**: a destructive kubectl call is declined and never runs.
//! 2. **Approve delete**: the same call is approved, runs, and is answered.
//! 3. **Retrieval summary**: retrieval output is replaced by a digest.
//! 4. **Compaction**: a long thread is folded into a rolling summary.

pub mod approve_delete;
pub mod compaction;
pub mod deny_delete;
pub mod retrieval_summary;

use std::sync::Arc;

use devpilot_checkpoint::{InMemoryCheckpointStore, TracingBroadcaster};
use devpilot_contracts::{
    error::DevpilotResult,
    execution::{RunOutcome, ThreadId},
    message::Message,
};
use devpilot_core::{AgentConfig, GraphEngine};
use devpilot_policy::CatalogApprovalPolicy;
use devpilot_verify::SchemaArgumentVerifier;

use crate::{
    fixtures::{fixture_registry, RecordingTool},
    model::ScriptedModel,
};

/// What a scenario run produced, for printing and for tests.
#[derive(Debug, Clone)]
pub struct ScenarioSummary {
    pub name: &'static str,
    /// The outcome of the final engine call.
    pub outcome: &'static str,
    pub kubectl_invocations: usize,
    pub messages: usize,
    pub logs: usize,
    pub summary: String,
    pub chain_verified: bool,
}

/// A scripted engine over the built-in catalog with fixture adapters.
pub struct Workbench {
    pub engine: GraphEngine,
    pub model: ScriptedModel,
    pub store: InMemoryCheckpointStore,
    pub kubectl: RecordingTool,
    pub thread: ThreadId,
}

impl Workbench {
    pub fn new(
        script: Vec<Message>,
        kubectl_output: &str,
        config: AgentConfig,
    ) -> DevpilotResult<Self> {
        let policy = CatalogApprovalPolicy::builtin()?;
        let kubectl = RecordingTool::new(kubectl_output);
        let registry = fixture_registry(policy.specs(), &kubectl);
        let model = ScriptedModel::new(script);
        let store = InMemoryCheckpointStore::new();

        let engine = GraphEngine::new(
            Arc::new(model.clone()),
            registry,
            Arc::new(policy),
            Arc::new(SchemaArgumentVerifier::new()),
            Arc::new(store.clone()),
            Arc::new(TracingBroadcaster),
            config,
        );

        Ok(Self {
            engine,
            model,
            store,
            kubectl,
            thread: ThreadId::new(),
        })
    }

    /// Print the final state and collect the summary.
    pub fn finish(&self, name: &'static str, outcome: &RunOutcome) -> ScenarioSummary {
        let state = outcome.state();
        let chain_verified = self.store.verify_integrity(&self.thread);

        println!("  Transcript ({} message(s)):", state.messages.len());
        for message in &state.messages {
            let body = if message.has_tool_calls() {
                message
                    .tool_calls
                    .iter()
                    .map(|c| format!("{}({})", c.name, serde_json::Value::Object(c.arguments.clone())))
                    .collect::<Vec<_>>()
                    .join(", ")
            } else {
                first_line(&message.content)
            };
            println!("    {:<9} {}", format!("{:?}", message.role).to_lowercase(), body);
        }
        if !state.summary.is_empty() {
            println!("  Summary: {}", first_line(&state.summary));
        }
        println!(
            "  Checkpoint chain:       {}",
            if chain_verified { "VERIFIED" } else { "FAILED" }
        );
        println!();

        ScenarioSummary {
            name,
            outcome: outcome_name(outcome),
            kubectl_invocations: self.kubectl.invocations(),
            messages: state.messages.len(),
            logs: state.logs.len(),
            summary: state.summary.clone(),
            chain_verified,
        }
    }
}

pub fn outcome_name(outcome: &RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Completed { .. } => "completed",
        RunOutcome::AwaitingApproval { .. } => "awaiting-approval",
        RunOutcome::Denied { .. } => "denied",
        RunOutcome::TimedOut { .. } => "timed-out",
        RunOutcome::Ignored { .. } => "ignored",
    }
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > 72 {
        format!("{}...", line.chars().take(72).collect::<String>())
    } else {
        line.to_string()
    }
}

/// Run every scenario in order.
pub async fn run_all() -> DevpilotResult<Vec<ScenarioSummary>> {
    Ok(vec![
        deny_delete::run_scenario().await?,
        approve_delete::run_scenario().await?,
        retrieval_summary::run_scenario().await?,
        compaction::run_scenario().await?,
    ])
}
