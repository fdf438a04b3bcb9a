//! `StateBroadcaster` implementations.

use tokio::sync::broadcast;
use tracing::{debug, trace};

use devpilot_contracts::execution::{BroadcastEvent, ThreadId};
use devpilot_core::traits::StateBroadcaster;

/// Fans events out to any number of async subscribers.
///
/// Slow subscribers lag and lose the oldest events; publishing never blocks.
#[derive(Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<(ThreadId, BroadcastEvent)>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<(ThreadId, BroadcastEvent)> {
        self.sender.subscribe()
    }
}

impl StateBroadcaster for ChannelBroadcaster {
    fn publish(&self, thread_id: &ThreadId, event: &BroadcastEvent) {
        // No subscribers is not an error.
        if self.sender.send((thread_id.clone(), event.clone())).is_err() {
            trace!(thread_id = %thread_id, "no broadcast subscribers");
        }
    }
}

/// Writes a one-line summary of each event to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBroadcaster;

impl StateBroadcaster for TracingBroadcaster {
    fn publish(&self, thread_id: &ThreadId, event: &BroadcastEvent) {
        match event {
            BroadcastEvent::Snapshot { state } => {
                let running = state.logs.iter().filter(|l| !l.done).count();
                debug!(
                    thread_id = %thread_id,
                    messages = state.messages.len(),
                    logs = state.logs.len(),
                    running,
                    "state snapshot"
                );
            }
            BroadcastEvent::ToolCallProposed { call } => {
                debug!(
                    thread_id = %thread_id,
                    call_id = %call.id,
                    tool = %call.name,
                    arguments = %serde_json::Value::Object(call.arguments.clone()),
                    "tool call proposed"
                );
            }
        }
    }
}
