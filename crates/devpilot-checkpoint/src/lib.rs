//! # devpilot-checkpoint
//!
//! Checkpoint stores and state broadcasters for the devpilot runtime.
//!
//! ## Overview
//!
//! - [`InMemoryCheckpointStore`] keeps every checkpoint a thread saves in a
//!   SHA-256 hash chain. Rewriting any stored checkpoint breaks the chain
//!   and is detected by `verify_integrity`.
//! - [`FileCheckpointStore`] keeps the latest checkpoint per thread as JSON
//!   on disk, so threads survive process restarts.
//! - [`ChannelBroadcaster`] and [`TracingBroadcaster`] implement
//!   `StateBroadcaster`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devpilot_checkpoint::InMemoryCheckpointStore;
//!
//! let store = InMemoryCheckpointStore::new();
//! // Pass `Arc::new(store.clone())` to the engine, keep `store` to inspect.
//! assert!(store.verify_integrity(&thread_id));
//! ```

pub mod broadcast;
pub mod chain;
pub mod file;
pub mod memory;
pub mod record;

pub use broadcast::{ChannelBroadcaster, TracingBroadcaster};
pub use chain::{hash_record, verify_chain};
pub use file::FileCheckpointStore;
pub use memory::InMemoryCheckpointStore;
pub use record::{CheckpointHistory, CheckpointRecord};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use devpilot_contracts::{
        execution::{BroadcastEvent, Checkpoint, Node, ThreadId, ThreadStatus},
        message::Message,
    };
    use devpilot_core::traits::{CheckpointStore, StateBroadcaster};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn make_checkpoint(thread: &str, version: u64, text: &str) -> Checkpoint {
        let mut checkpoint = Checkpoint::fresh(ThreadId::from(thread));
        checkpoint.version = version;
        checkpoint.state.messages.push(Message::human(text));
        checkpoint
    }

    // ── InMemoryCheckpointStore ───────────────────────────────────────────────

    /// Load returns the newest checkpoint; history keeps all of them.
    #[test]
    fn test_load_returns_latest() {
        let store = InMemoryCheckpointStore::new();
        let thread = ThreadId::from("t-latest");
        store.save(&make_checkpoint("t-latest", 1, "first")).unwrap();
        store.save(&make_checkpoint("t-latest", 2, "second")).unwrap();

        let loaded = store.load(&thread).unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.state.messages[0].content, "second");

        let history = store.history(&thread).unwrap();
        assert_eq!(history.records.len(), 2);
        assert_eq!(history.head_hash, history.records[1].this_hash);
    }

    #[test]
    fn test_unknown_thread_loads_none() {
        let store = InMemoryCheckpointStore::new();
        assert!(store.load(&ThreadId::from("nobody")).unwrap().is_none());
        assert!(store.verify_integrity(&ThreadId::from("nobody")));
    }

    /// Writing several checkpoints and verifying produces a valid chain.
    #[test]
    fn test_hash_chain_integrity() {
        let store = InMemoryCheckpointStore::new();
        for v in 1..=3 {
            store.save(&make_checkpoint("t-chain", v, "step")).unwrap();
        }

        let thread = ThreadId::from("t-chain");
        assert!(store.verify_integrity(&thread));

        let history = store.history(&thread).unwrap();
        assert_eq!(history.records[0].prev_hash, CheckpointRecord::GENESIS_HASH);
        for (idx, record) in history.records.iter().enumerate() {
            assert_eq!(record.sequence, idx as u64);
        }
        assert!(verify_chain(&history.records));
    }

    /// Rewriting a stored transcript breaks the chain.
    #[test]
    fn test_tamper_detection() {
        let store = InMemoryCheckpointStore::new();
        store.save(&make_checkpoint("t-tamper", 1, "delete web")).unwrap();
        store.save(&make_checkpoint("t-tamper", 2, "NO")).unwrap();

        let thread = ThreadId::from("t-tamper");
        {
            let mut chains = store.chains.lock().unwrap();
            let chain = chains.get_mut(&thread).unwrap();
            chain.records[1].checkpoint.state.messages[0].content = "YES".to_string();
        }

        assert!(!store.verify_integrity(&thread), "chain must detect a rewritten decision");
    }

    /// Chains are per thread.
    #[test]
    fn test_threads_are_independent() {
        let store = InMemoryCheckpointStore::new();
        store.save(&make_checkpoint("t-a", 1, "a")).unwrap();
        store.save(&make_checkpoint("t-b", 1, "b")).unwrap();

        let a = store.history(&ThreadId::from("t-a")).unwrap();
        let b = store.history(&ThreadId::from("t-b")).unwrap();
        assert_eq!(a.records[0].prev_hash, CheckpointRecord::GENESIS_HASH);
        assert_eq!(b.records[0].prev_hash, CheckpointRecord::GENESIS_HASH);
        assert_ne!(a.head_hash, b.head_hash);
        assert_eq!(store.threads().len(), 2);
    }

    // ── FileCheckpointStore ───────────────────────────────────────────────────

    #[test]
    fn test_file_store_round_trips_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path().join("state")).unwrap();

        let mut checkpoint = make_checkpoint("t-file", 4, "scale web");
        checkpoint.status = ThreadStatus::AwaitingApproval {
            call_id: "c1".to_string(),
            tool_name: "kubectl_exec".to_string(),
        };
        checkpoint.next = Some(Node::HumanReview);
        store.save(&checkpoint).unwrap();

        // A second store over the same directory sees the same thread.
        let reopened = FileCheckpointStore::open(store.dir()).unwrap();
        let loaded = reopened.load(&ThreadId::from("t-file")).unwrap().unwrap();
        assert_eq!(loaded, checkpoint);
        assert!(!store.path_for(&checkpoint.thread_id).with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_encodes_unsafe_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path()).unwrap();

        let path = store.path_for(&ThreadId::from("../etc/passwd"));
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("x-"));

        assert_eq!(
            store.path_for(&ThreadId::from("ops-42")).file_name().unwrap(),
            "ops-42.json"
        );
    }

    #[test]
    fn test_file_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path()).unwrap();
        let thread = ThreadId::from("t-corrupt");
        std::fs::write(store.path_for(&thread), "{ not json").unwrap();

        let err = store.load(&thread).unwrap_err();
        assert!(err.to_string().contains("corrupt checkpoint"));
    }

    // ── Broadcasters ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_channel_broadcaster_delivers_to_subscribers() {
        let broadcaster = ChannelBroadcaster::new(8);
        let mut rx = broadcaster.subscribe();

        let checkpoint = make_checkpoint("t-bcast", 1, "hello");
        broadcaster.publish(
            &checkpoint.thread_id,
            &BroadcastEvent::Snapshot {
                state: checkpoint.state.clone(),
            },
        );

        let (thread, event) = rx.recv().await.unwrap();
        assert_eq!(thread, checkpoint.thread_id);
        assert_eq!(event, BroadcastEvent::Snapshot { state: checkpoint.state });
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let broadcaster = ChannelBroadcaster::new(1);
        let checkpoint = make_checkpoint("t-quiet", 1, "hello");
        broadcaster.publish(
            &checkpoint.thread_id,
            &BroadcastEvent::Snapshot { state: checkpoint.state },
        );
        TracingBroadcaster.publish(
            &checkpoint.thread_id,
            &BroadcastEvent::Snapshot { state: Default::default() },
        );
    }
}
