//! The graph engine: drives a thread through the orchestration graph.
//!
//!   assistant → (summarize_conversation | human_node | run_tool | end)
//!   human_node ⇢ suspend ⇢ human_review_node → (run_tool | end)
//!   run_tool → (human_node | run_tool | assistant)
//!
//! Before entering every node the engine saves a checkpoint naming that
//! node, so an interrupted execution can be resumed from its last boundary.
//! A thread is driven by at most one execution at a time.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    execution::{BroadcastEvent, Checkpoint, Node, RunOutcome, ThreadId, ThreadStatus},
    message::{Decision, Message, Role, ToolCall},
    state::{AgentState, AutoApprove},
};

use crate::{
    config::AgentConfig,
    nodes::{NodeExit, Review},
    registry::ToolRegistry,
    router::{route_after_assistant, route_after_summarize, route_after_tool, Route},
    traits::{ApprovalPolicy, ArgumentVerifier, CheckpointStore, LanguageModel, StateBroadcaster},
};

type ThreadLocks = Mutex<HashMap<ThreadId, Arc<tokio::sync::Mutex<()>>>>;

/// How one execution ended, before the state is attached.
enum Exit {
    Completed,
    Awaiting { call: ToolCall, reason: String },
    Denied { call: ToolCall },
    TimedOut { stage: Node },
}

/// The orchestration runtime for any number of threads.
///
/// The engine owns the model, the tool registry, and the trusted
/// components. It is cheap to share behind an `Arc`; per-thread exclusivity
/// is enforced internally.
pub struct GraphEngine {
    pub(crate) model: Arc<dyn LanguageModel>,
    pub(crate) registry: ToolRegistry,
    pub(crate) policy: Arc<dyn ApprovalPolicy>,
    pub(crate) verifier: Arc<dyn ArgumentVerifier>,
    pub(crate) store: Arc<dyn CheckpointStore>,
    pub(crate) broadcaster: Arc<dyn StateBroadcaster>,
    pub(crate) config: AgentConfig,
    locks: ThreadLocks,
}

impl GraphEngine {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: ToolRegistry,
        policy: Arc<dyn ApprovalPolicy>,
        verifier: Arc<dyn ArgumentVerifier>,
        store: Arc<dyn CheckpointStore>,
        broadcaster: Arc<dyn StateBroadcaster>,
        config: AgentConfig,
    ) -> Self {
        Self {
            model,
            registry,
            policy,
            verifier,
            store,
            broadcaster,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Deliver one inbound message to a thread and drive it until it
    /// completes, suspends, or fails.
    ///
    /// - Thread idle: the message is appended and the assistant runs.
    /// - Thread paused: the content must be `"YES"` or `"NO"`; it is stored
    ///   as the decision for the awaited call and the review node runs.
    /// - A message whose id is already in the transcript, or a tool message
    ///   that answers nothing the thread is waiting on, is `Ignored`.
    ///
    /// # Errors
    ///
    /// - `InvalidDecision` if a paused thread receives other content; the
    ///   thread is left untouched.
    /// - `ThreadBusy` if the last checkpoint shows an interrupted execution.
    /// - Any node failure; the thread is checkpointed idle with whatever
    ///   the failing node recorded before returning.
    pub async fn invoke(&self, thread_id: &ThreadId, message: Message) -> DevpilotResult<RunOutcome> {
        let _guard = self.lock_thread(thread_id).await;

        let mut checkpoint = self.load_or_fresh(thread_id)?;

        if checkpoint.state.contains_message(&message) {
            debug!(thread_id = %thread_id, "message already applied, ignoring replay");
            return Ok(ignored("message already applied", checkpoint.state));
        }

        match checkpoint.status.clone() {
            ThreadStatus::Running => Err(DevpilotError::ThreadBusy {
                thread_id: thread_id.to_string(),
            }),

            ThreadStatus::AwaitingApproval { call_id, tool_name } => {
                if let Some(answered) = message.tool_call_id.as_deref() {
                    if answered != call_id {
                        warn!(
                            thread_id = %thread_id,
                            awaited = %call_id,
                            answered = %answered,
                            "decision for a call the thread is not awaiting"
                        );
                        return Ok(ignored(
                            format!("thread awaits a decision for call '{call_id}', not '{answered}'"),
                            checkpoint.state,
                        ));
                    }
                }

                let decision = Decision::parse(&message.content).ok_or_else(|| {
                    DevpilotError::InvalidDecision {
                        content: message.content.clone(),
                    }
                })?;

                info!(
                    thread_id = %thread_id,
                    call_id = %call_id,
                    tool = %tool_name,
                    decision = decision.as_str(),
                    "approval decision received"
                );

                checkpoint.state.messages.push(Message {
                    id: message.id,
                    ..Message::decision(call_id, decision)
                });
                self.drive(checkpoint, Node::HumanReview).await
            }

            ThreadStatus::Terminal => {
                if message.role == Role::Tool {
                    debug!(thread_id = %thread_id, "tool message with no pending approval, ignoring");
                    return Ok(ignored("no approval is pending on this thread", checkpoint.state));
                }
                checkpoint.state.messages.push(message);
                self.drive(checkpoint, Node::Assistant).await
            }
        }
    }

    /// Continue an execution that was interrupted between nodes.
    ///
    /// A paused thread reports its pending approval again; an idle thread
    /// is `Ignored`.
    pub async fn resume(&self, thread_id: &ThreadId) -> DevpilotResult<RunOutcome> {
        let _guard = self.lock_thread(thread_id).await;

        let checkpoint = self.load_or_fresh(thread_id)?;
        match (checkpoint.status.clone(), checkpoint.next) {
            (ThreadStatus::Running, Some(next)) => {
                info!(thread_id = %thread_id, node = %next, "resuming interrupted execution");
                self.drive(checkpoint, next).await
            }
            (ThreadStatus::Running, None) => Err(DevpilotError::StateInconsistency {
                reason: format!("thread '{thread_id}' is running with no next node recorded"),
            }),
            (ThreadStatus::AwaitingApproval { call_id, .. }, _) => {
                let call = checkpoint
                    .state
                    .unanswered_calls()
                    .into_iter()
                    .find(|c| c.id == call_id)
                    .cloned()
                    .ok_or_else(|| DevpilotError::StateInconsistency {
                        reason: format!("awaited call '{call_id}' is not on the open proposal"),
                    })?;
                Ok(RunOutcome::AwaitingApproval {
                    call,
                    reason: "awaiting a decision".to_string(),
                    state: checkpoint.state,
                })
            }
            (ThreadStatus::Terminal, _) => Ok(ignored("nothing to resume", checkpoint.state)),
        }
    }

    /// Answer the call a paused thread is waiting on.
    ///
    /// The decision is addressed to the awaited call by id, so it can never
    /// be taken for an ordinary chat turn.
    ///
    /// # Errors
    ///
    /// `NoPendingApproval` if the thread is not paused at the gate.
    pub async fn decide(&self, thread_id: &ThreadId, decision: Decision) -> DevpilotResult<RunOutcome> {
        let call_id = match self.load_or_fresh(thread_id)?.status {
            ThreadStatus::AwaitingApproval { call_id, .. } => call_id,
            _ => {
                return Err(DevpilotError::NoPendingApproval {
                    thread_id: thread_id.to_string(),
                })
            }
        };
        self.invoke(thread_id, Message::decision(call_id, decision)).await
    }

    /// Change a thread's approval toggle. Takes effect on the next routing
    /// decision; a call already paused stays paused.
    pub async fn set_auto_approve(
        &self,
        thread_id: &ThreadId,
        auto_approve: AutoApprove,
    ) -> DevpilotResult<AgentState> {
        let _guard = self.lock_thread(thread_id).await;

        let mut checkpoint = self.load_or_fresh(thread_id)?;
        checkpoint.state.auto_approve = auto_approve;
        self.persist(&mut checkpoint)?;
        Ok(checkpoint.state)
    }

    /// The thread's latest persisted checkpoint.
    pub fn checkpoint(&self, thread_id: &ThreadId) -> DevpilotResult<Checkpoint> {
        self.load_or_fresh(thread_id)
    }

    /// The thread's latest persisted state.
    pub fn state(&self, thread_id: &ThreadId) -> DevpilotResult<AgentState> {
        Ok(self.load_or_fresh(thread_id)?.state)
    }

    // ── Graph loop ──────────────────────────────────────────────────────────

    async fn drive(&self, mut checkpoint: Checkpoint, start: Node) -> DevpilotResult<RunOutcome> {
        let thread_id = checkpoint.thread_id.clone();
        let mut gate: Option<(ToolCall, String)> = None;
        let mut next = start;
        let mut steps = 0usize;

        let exit = loop {
            if next == Node::End {
                break Exit::Completed;
            }

            steps += 1;
            if steps > self.config.max_steps {
                warn!(thread_id = %thread_id, limit = self.config.max_steps, "step limit exceeded");
                let err = DevpilotError::StepLimitExceeded {
                    limit: self.config.max_steps,
                };
                return self.abort(checkpoint, err);
            }

            checkpoint.status = ThreadStatus::Running;
            checkpoint.next = Some(next);
            self.persist(&mut checkpoint)?;

            debug!(thread_id = %thread_id, node = %next, step = steps, "entering node");

            let flow = match self.run_node(next, &thread_id, &mut checkpoint.state, &mut gate).await {
                Ok(flow) => flow,
                Err(err) => return self.abort(checkpoint, err),
            };

            match flow {
                Ok(node) => next = node,
                Err(exit) => break exit,
            }
        };

        self.finish(checkpoint, exit)
    }

    /// Run one node, then pick the edge out of it. `Ok(node)` continues the
    /// loop; `Err(exit)` ends the execution.
    async fn run_node(
        &self,
        node: Node,
        thread_id: &ThreadId,
        state: &mut AgentState,
        gate: &mut Option<(ToolCall, String)>,
    ) -> DevpilotResult<Result<Node, Exit>> {
        let policy = self.policy.as_ref();

        let route = match node {
            Node::Assistant => match self.assistant(thread_id, state).await? {
                NodeExit::TimedOut => return Ok(Err(Exit::TimedOut { stage: node })),
                NodeExit::Done => route_after_assistant(state, thread_id, policy, self.config.summary_threshold),
            },

            Node::Summarize => {
                self.summarize(thread_id, state).await?;
                route_after_summarize(state, thread_id, policy)
            }

            Node::HumanNode => {
                let (call, reason) = match gate.take() {
                    Some(gated) => gated,
                    None => match route_after_tool(state, thread_id, policy) {
                        Route::Approve { call, reason } => (call, reason),
                        _ => (state.pending_call()?.call, "approval required".to_string()),
                    },
                };
                return Ok(Err(Exit::Awaiting { call, reason }));
            }

            Node::HumanReview => match self.human_review(thread_id, state)? {
                Review::Approved => Route::RunTool,
                Review::Denied(call) => return Ok(Err(Exit::Denied { call })),
            },

            Node::RunTool => {
                self.run_tool(thread_id, state).await?;
                route_after_tool(state, thread_id, policy)
            }

            Node::End => return Ok(Err(Exit::Completed)),
        };

        if let Route::Approve { call, reason } = &route {
            *gate = Some((call.clone(), reason.clone()));
        }
        Ok(Ok(route.node()))
    }

    fn finish(&self, mut checkpoint: Checkpoint, exit: Exit) -> DevpilotResult<RunOutcome> {
        let thread_id = checkpoint.thread_id.clone();

        match &exit {
            Exit::Awaiting { call, .. } => {
                checkpoint.status = ThreadStatus::AwaitingApproval {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                };
                checkpoint.next = Some(Node::HumanReview);
            }
            _ => {
                checkpoint.status = ThreadStatus::Terminal;
                checkpoint.next = None;
            }
        }
        self.persist(&mut checkpoint)?;

        let state = checkpoint.state;
        let outcome = match exit {
            Exit::Completed => {
                info!(thread_id = %thread_id, "execution completed");
                RunOutcome::Completed { state }
            }
            Exit::Awaiting { call, reason } => {
                info!(
                    thread_id = %thread_id,
                    call_id = %call.id,
                    tool = %call.name,
                    "execution suspended awaiting approval"
                );
                RunOutcome::AwaitingApproval { call, reason, state }
            }
            Exit::Denied { call } => {
                info!(thread_id = %thread_id, call_id = %call.id, tool = %call.name, "tool call denied");
                RunOutcome::Denied { call, state }
            }
            Exit::TimedOut { stage } => {
                warn!(thread_id = %thread_id, node = %stage, "execution ended on timeout");
                RunOutcome::TimedOut { stage, state }
            }
        };
        Ok(outcome)
    }

    /// Persist the thread idle with whatever the failing node recorded, then
    /// surface the original error.
    fn abort(&self, mut checkpoint: Checkpoint, err: DevpilotError) -> DevpilotResult<RunOutcome> {
        warn!(thread_id = %checkpoint.thread_id, error = %err, "execution failed");
        checkpoint.status = ThreadStatus::Terminal;
        checkpoint.next = None;
        if let Err(save_err) = self.persist(&mut checkpoint) {
            warn!(
                thread_id = %checkpoint.thread_id,
                error = %save_err,
                "could not checkpoint failed execution"
            );
        }
        Err(err)
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    pub(crate) fn publish(&self, thread_id: &ThreadId, state: &AgentState) {
        self.broadcaster.publish(
            thread_id,
            &BroadcastEvent::Snapshot {
                state: state.clone(),
            },
        );
    }

    fn persist(&self, checkpoint: &mut Checkpoint) -> DevpilotResult<()> {
        checkpoint.version += 1;
        checkpoint.updated_at = Utc::now();
        self.store.save(checkpoint)
    }

    fn load_or_fresh(&self, thread_id: &ThreadId) -> DevpilotResult<Checkpoint> {
        Ok(self
            .store
            .load(thread_id)?
            .unwrap_or_else(|| Checkpoint::fresh(thread_id.clone())))
    }

    async fn lock_thread(&self, thread_id: &ThreadId) -> ThreadGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(thread_id.clone()).or_default().clone()
        };
        let held = lock.clone().lock_owned().await;
        ThreadGuard {
            locks: &self.locks,
            thread_id: thread_id.clone(),
            lock,
            held: Some(held),
        }
    }
}

/// Exclusive hold on one thread. Dropping it releases the thread and removes
/// its lock from the map once no other caller holds or awaits it.
struct ThreadGuard<'a> {
    locks: &'a ThreadLocks,
    thread_id: ThreadId,
    lock: Arc<tokio::sync::Mutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for ThreadGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.thread_id);
        }
    }
}

fn ignored(reason: impl Into<String>, state: AgentState) -> RunOutcome {
    RunOutcome::Ignored {
        reason: reason.into(),
        state,
    }
}
