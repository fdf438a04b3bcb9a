//! Scenario 1: Deny a destructive call
//!
//! The operator asks to remove a deployment. The model proposes
//! `kubectl delete deployment web`; `kubectl_exec` requires approval, so the
//! thread pauses. The operator answers "NO":
//!   1. The call is recorded as aborted in the progress log
//!   2. The decision marker becomes the tool result "NO"
//!   3. The adapter is never invoked and the turn ends

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    execution::RunOutcome,
    message::Message,
};
use devpilot_core::AgentConfig;

use crate::fixtures::{kubectl_call, KUBECTL_DELETE_OUTPUT};

use super::{outcome_name, ScenarioSummary, Workbench};

pub async fn run_scenario() -> DevpilotResult<ScenarioSummary> {
    println!("=== Scenario 1: Deny a destructive call ===");
    println!();

    let bench = Workbench::new(
        vec![Message::assistant_with_calls(
            "",
            vec![kubectl_call("call_delete", "delete deployment web")],
        )],
        KUBECTL_DELETE_OUTPUT,
        AgentConfig::default(),
    )?;

    println!("  Request:  delete the web deployment");
    let first = bench
        .engine
        .invoke(&bench.thread, Message::human("delete the web deployment"))
        .await?;
    match &first {
        RunOutcome::AwaitingApproval { call, reason, .. } => {
            println!("  Paused:   {} ({})", call.name, reason);
        }
        other => {
            return Err(DevpilotError::StateInconsistency {
                reason: format!("expected a pause for approval, got {}", outcome_name(other)),
            })
        }
    }

    println!("  Decision: NO");
    let outcome = bench.engine.invoke(&bench.thread, Message::human("NO")).await?;
    println!("  Outcome:  {}", outcome_name(&outcome));
    println!("  kubectl invocations: {}", bench.kubectl.invocations());
    println!();

    Ok(bench.finish("deny-delete", &outcome))
}

#[cfg(test)]
mod tests {
    use devpilot_contracts::message::Role;

    use super::*;

    #[tokio::test]
    async fn test_denied_call_never_runs() {
        let summary = run_scenario().await.unwrap();

        assert_eq!(summary.outcome, "denied");
        assert_eq!(summary.kubectl_invocations, 0);
        assert_eq!(summary.logs, 1);
        assert!(summary.chain_verified);
    }

    #[tokio::test]
    async fn test_denial_is_the_tool_result() {
        let bench = Workbench::new(
            vec![Message::assistant_with_calls(
                "",
                vec![kubectl_call("call_delete", "delete deployment web")],
            )],
            KUBECTL_DELETE_OUTPUT,
            AgentConfig::default(),
        )
        .unwrap();
        bench.engine.invoke(&bench.thread, Message::human("delete web")).await.unwrap();
        let outcome = bench.engine.invoke(&bench.thread, Message::human("NO")).await.unwrap();

        let last = outcome.state().last_message().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.content, "NO");
        assert_eq!(last.tool_call_id.as_deref(), Some("call_delete"));
        assert_eq!(outcome.state().logs[0].message, "Aborted cmd");
    }
}
