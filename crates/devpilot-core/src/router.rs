//! Conditional edges of the orchestration graph.
//!
//! Routing is pure: it reads the state and consults the approval policy, and
//! never mutates anything. The engine persists the chosen node before
//! entering it.

use devpilot_contracts::{
    execution::{Node, ThreadId},
    message::ToolCall,
    policy::{ApprovalContext, ApprovalVerdict},
    state::AgentState,
};

use crate::traits::ApprovalPolicy;

/// Where control goes next.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Assistant,
    Summarize,
    /// Pause at the approval gate for `call`.
    Approve { call: ToolCall, reason: String },
    RunTool,
    End,
}

impl Route {
    pub fn node(&self) -> Node {
        match self {
            Route::Assistant => Node::Assistant,
            Route::Summarize => Node::Summarize,
            Route::Approve { .. } => Node::HumanNode,
            Route::RunTool => Node::RunTool,
            Route::End => Node::End,
        }
    }
}

/// The edge out of the assistant node.
///
/// 1. Transcript longer than `summary_threshold` and neither of the last two
///    messages proposes calls → `Summarize`.
/// 2. Last message proposes no calls → `End`.
/// 3. First call the policy gates → `Approve`.
/// 4. Otherwise → `RunTool`.
pub fn route_after_assistant(
    state: &AgentState,
    thread_id: &ThreadId,
    policy: &dyn ApprovalPolicy,
    summary_threshold: usize,
) -> Route {
    if state.messages.len() > summary_threshold && state.tail_is_settled() {
        return Route::Summarize;
    }
    match state.last_message() {
        Some(last) if last.has_tool_calls() => gate(&last.tool_calls, state, thread_id, policy),
        _ => Route::End,
    }
}

/// The edge out of the compactor: the same decision minus the length rule.
pub fn route_after_summarize(
    state: &AgentState,
    thread_id: &ThreadId,
    policy: &dyn ApprovalPolicy,
) -> Route {
    match state.last_message() {
        Some(last) if last.has_tool_calls() => gate(&last.tool_calls, state, thread_id, policy),
        _ => Route::End,
    }
}

/// The edge out of the tool node. Calls on the proposal that are still
/// unanswered go through the gate again; otherwise the model sees the result.
pub fn route_after_tool(
    state: &AgentState,
    thread_id: &ThreadId,
    policy: &dyn ApprovalPolicy,
) -> Route {
    let remaining: Vec<ToolCall> = state.unanswered_calls().into_iter().cloned().collect();
    if remaining.is_empty() {
        Route::Assistant
    } else {
        gate(&remaining, state, thread_id, policy)
    }
}

fn gate(
    calls: &[ToolCall],
    state: &AgentState,
    thread_id: &ThreadId,
    policy: &dyn ApprovalPolicy,
) -> Route {
    for call in calls {
        let ctx = ApprovalContext {
            thread_id: thread_id.0.clone(),
            tool_name: call.name.clone(),
            operation: call.operation().map(str::to_string),
            auto_approve: state.auto_approve,
        };
        if let ApprovalVerdict::RequireApproval { reason } = policy.evaluate(&ctx) {
            return Route::Approve {
                call: call.clone(),
                reason,
            };
        }
    }
    Route::RunTool
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use devpilot_contracts::{
        message::{Message, ToolCall},
        state::AutoApprove,
    };

    use super::*;

    /// Gates the listed tools unless the thread auto-approves.
    struct NamedToolPolicy(Vec<&'static str>);

    impl ApprovalPolicy for NamedToolPolicy {
        fn evaluate(&self, ctx: &ApprovalContext) -> ApprovalVerdict {
            if ctx.auto_approve == AutoApprove::No && self.0.contains(&ctx.tool_name.as_str()) {
                ApprovalVerdict::RequireApproval {
                    reason: format!("{} requires approval", ctx.tool_name),
                }
            } else {
                ApprovalVerdict::Allow
            }
        }
    }

    fn call(id: &str, name: &str, command: &str) -> ToolCall {
        let args = json!({ "command": command }).as_object().cloned().unwrap();
        ToolCall::new(id, name, args)
    }

    fn state_with(messages: Vec<Message>, auto_approve: AutoApprove) -> AgentState {
        AgentState {
            messages,
            ..AgentState::new(auto_approve)
        }
    }

    fn thread() -> ThreadId {
        ThreadId::from("t-router")
    }

    #[test]
    fn final_answer_routes_to_end() {
        let policy = NamedToolPolicy(vec!["kubectl_exec"]);
        let state = state_with(
            vec![Message::human("hi"), Message::assistant("hello")],
            AutoApprove::No,
        );
        assert_eq!(route_after_assistant(&state, &thread(), &policy, 25), Route::End);
    }

    #[test]
    fn gated_call_routes_to_approval() {
        let policy = NamedToolPolicy(vec!["kubectl_exec"]);
        let state = state_with(
            vec![
                Message::human("delete web"),
                Message::assistant_with_calls("", vec![call("c1", "kubectl_exec", "delete deploy web")]),
            ],
            AutoApprove::No,
        );
        match route_after_assistant(&state, &thread(), &policy, 25) {
            Route::Approve { call, reason } => {
                assert_eq!(call.id, "c1");
                assert!(reason.contains("kubectl_exec"));
            }
            other => panic!("expected Approve, got {:?}", other),
        }
    }

    #[test]
    fn auto_approve_routes_to_tool() {
        let policy = NamedToolPolicy(vec!["kubectl_exec"]);
        let state = state_with(
            vec![Message::assistant_with_calls(
                "",
                vec![call("c1", "kubectl_exec", "delete deploy web")],
            )],
            AutoApprove::Yes,
        );
        assert_eq!(route_after_assistant(&state, &thread(), &policy, 25), Route::RunTool);
    }

    #[test]
    fn first_gated_call_wins_over_earlier_ungated() {
        let policy = NamedToolPolicy(vec!["helm_exec"]);
        let state = state_with(
            vec![Message::assistant_with_calls(
                "",
                vec![
                    call("c1", "git_exec", "status"),
                    call("c2", "helm_exec", "uninstall web"),
                ],
            )],
            AutoApprove::No,
        );
        let route = route_after_assistant(&state, &thread(), &policy, 25);
        assert!(matches!(route, Route::Approve { ref call, .. } if call.id == "c2"));
        assert_eq!(route.node(), Node::HumanNode);
    }

    #[test]
    fn long_settled_transcript_routes_to_summarize() {
        let policy = NamedToolPolicy(vec![]);
        let mut messages: Vec<Message> = (0..6).map(|i| Message::human(format!("m{i}"))).collect();
        messages.push(Message::assistant("done"));
        let state = state_with(messages, AutoApprove::No);

        assert_eq!(route_after_assistant(&state, &thread(), &policy, 5), Route::Summarize);
        assert_eq!(route_after_assistant(&state, &thread(), &policy, 7), Route::End);
    }

    #[test]
    fn long_transcript_with_pending_call_is_not_summarized() {
        let policy = NamedToolPolicy(vec![]);
        let mut messages: Vec<Message> = (0..6).map(|i| Message::human(format!("m{i}"))).collect();
        messages.push(Message::assistant_with_calls("", vec![call("c1", "git_exec", "log")]));
        let state = state_with(messages, AutoApprove::No);

        assert_eq!(route_after_assistant(&state, &thread(), &policy, 3), Route::RunTool);
    }

    #[test]
    fn after_tool_returns_to_assistant_when_all_answered() {
        let policy = NamedToolPolicy(vec![]);
        let state = state_with(
            vec![
                Message::assistant_with_calls("", vec![call("c1", "git_exec", "log")]),
                Message::tool_result("c1", "git_exec", "abc123 init"),
            ],
            AutoApprove::No,
        );
        assert_eq!(route_after_tool(&state, &thread(), &policy), Route::Assistant);
    }

    #[test]
    fn after_tool_gates_remaining_calls() {
        let policy = NamedToolPolicy(vec!["kubectl_exec"]);
        let state = state_with(
            vec![
                Message::assistant_with_calls(
                    "",
                    vec![
                        call("c1", "kubectl_exec", "get pods"),
                        call("c2", "kubectl_exec", "delete pod web-1"),
                    ],
                ),
                Message::tool_result("c1", "kubectl_exec", "web-1 Running"),
            ],
            AutoApprove::No,
        );
        match route_after_tool(&state, &thread(), &policy) {
            Route::Approve { call, .. } => assert_eq!(call.id, "c2"),
            other => panic!("expected Approve, got {:?}", other),
        }
    }
}
