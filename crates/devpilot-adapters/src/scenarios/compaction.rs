//! Scenario 4: History compaction
//!
//! A thread with `auto_approve = yes` and a small history limit runs two
//! turns. Once the transcript passes the threshold and the last answer is
//! settled, the compactor folds everything but the newest messages into the
//! rolling summary, which then replaces the system prompt.

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    message::{Message, Role},
    state::AutoApprove,
};
use devpilot_core::AgentConfig;

use crate::fixtures::{kubectl_call, KUBECTL_GET_PODS_OUTPUT};

use super::{outcome_name, ScenarioSummary, Workbench};

pub const SUMMARY: &str = "The operator checked pods (all web and worker pods Running) and then services.";

pub fn compaction_config() -> AgentConfig {
    AgentConfig {
        summary_threshold: 4,
        keep_after_summary: 2,
        ..AgentConfig::default()
    }
}

pub async fn run_scenario() -> DevpilotResult<ScenarioSummary> {
    println!("=== Scenario 4: History compaction ===");
    println!();

    let bench = Workbench::new(
        vec![
            Message::assistant_with_calls("", vec![kubectl_call("call_pods", "get pods")]),
            Message::assistant("All three pods are Running."),
            Message::assistant("Two services are exposed: web and worker."),
            Message::assistant(SUMMARY),
            Message::assistant("web is exposed on port 80."),
        ],
        KUBECTL_GET_PODS_OUTPUT,
        compaction_config(),
    )?;
    bench.engine.set_auto_approve(&bench.thread, AutoApprove::Yes).await?;

    let turns = ["check the pods", "and the services?", "which port does web use?"];
    let mut last = None;
    for turn in turns {
        let outcome = bench.engine.invoke(&bench.thread, Message::human(turn)).await?;
        let state = outcome.state();
        println!(
            "  Turn {:<28} -> {} ({} message(s), summary {})",
            format!("{turn:?}"),
            outcome_name(&outcome),
            state.messages.len(),
            if state.summary.is_empty() { "empty" } else { "set" }
        );
        last = Some(outcome);
    }
    println!();

    let outcome = last.ok_or_else(|| DevpilotError::StateInconsistency {
        reason: "compaction scenario ran no turns".to_string(),
    })?;

    // The third turn must have been prompted with the summary, not the
    // default system prompt.
    if let Some(request) = bench.model.requests().last() {
        if let Some(first) = request.messages.first() {
            if first.role == Role::System {
                println!("  Prompt preamble: {}", first.content);
            }
        }
    }

    Ok(bench.finish("compaction", &outcome))
}
