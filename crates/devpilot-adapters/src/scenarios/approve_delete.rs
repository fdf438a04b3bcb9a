//! Scenario 2: Approve a destructive call
//!
//! Same request as scenario 1, but the operator answers "YES". The call runs
//! against the (fixture) cluster, the output replaces the decision marker,
//! and the model writes the final answer from it.

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    execution::RunOutcome,
    message::Message,
};
use devpilot_core::AgentConfig;

use crate::fixtures::{kubectl_call, KUBECTL_DELETE_OUTPUT};

use super::{outcome_name, ScenarioSummary, Workbench};

pub async fn run_scenario() -> DevpilotResult<ScenarioSummary> {
    println!("=== Scenario 2: Approve a destructive call ===");
    println!();

    let bench = Workbench::new(
        vec![
            Message::assistant_with_calls("", vec![kubectl_call("call_delete", "delete deployment web")]),
            Message::assistant("The web deployment has been deleted."),
        ],
        KUBECTL_DELETE_OUTPUT,
        AgentConfig::default(),
    )?;

    println!("  Request:  delete the web deployment");
    let first = bench
        .engine
        .invoke(&bench.thread, Message::human("delete the web deployment"))
        .await?;
    let RunOutcome::AwaitingApproval { call, .. } = &first else {
        return Err(DevpilotError::StateInconsistency {
            reason: format!("expected a pause for approval, got {}", outcome_name(&first)),
        });
    };
    println!("  Paused:   {} {}", call.name, call.operation().unwrap_or("-"));

    // The decision names the call it answers.
    println!("  Decision: YES");
    let decision = Message {
        tool_call_id: Some(call.id.clone()),
        ..Message::human("YES")
    };
    let outcome = bench.engine.invoke(&bench.thread, decision).await?;
    println!("  Outcome:  {}", outcome_name(&outcome));
    println!("  kubectl invocations: {}", bench.kubectl.invocations());
    println!();

    Ok(bench.finish("approve-delete", &outcome))
}

#[cfg(test)]
mod tests {
    use devpilot_contracts::message::Role;

    use super::*;

    #[tokio::test]
    async fn test_approved_call_runs_once() {
        let summary = run_scenario().await.unwrap();

        assert_eq!(summary.outcome, "completed");
        assert_eq!(summary.kubectl_invocations, 1);
        // human, proposal, tool result, final answer
        assert_eq!(summary.messages, 4);
        assert!(summary.chain_verified);
    }

    #[tokio::test]
    async fn test_tool_output_replaces_marker() {
        let bench = Workbench::new(
            vec![
                Message::assistant_with_calls("", vec![kubectl_call("c1", "delete deployment web")]),
                Message::assistant("done"),
            ],
            KUBECTL_DELETE_OUTPUT,
            AgentConfig::default(),
        )
        .unwrap();
        bench.engine.invoke(&bench.thread, Message::human("delete web")).await.unwrap();
        let outcome = bench.engine.invoke(&bench.thread, Message::human("YES")).await.unwrap();

        let tool = &outcome.state().messages[2];
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.content, KUBECTL_DELETE_OUTPUT);
        assert!(tool.decision.is_none());
        assert_eq!(
            bench.kubectl.last_arguments().unwrap()["command"],
            "delete deployment web"
        );
    }
}
