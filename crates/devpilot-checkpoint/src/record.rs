//! Checkpoint record and history types.
//!
//! `CheckpointRecord` is a single entry in a thread's hash chain: it wraps a
//! `Checkpoint` with sequence numbering and the SHA-256 hashes that make
//! tampering detectable. `CheckpointHistory` is the exported chain of one
//! thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use devpilot_contracts::execution::Checkpoint;

/// One saved checkpoint in a thread's chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Position in the thread's chain, starting at 0.
    pub sequence: u64,
    pub thread_id: String,
    pub checkpoint: Checkpoint,
    /// `this_hash` of the previous record, or `GENESIS_HASH` for the first.
    pub prev_hash: String,
    /// Computed by `hash_record()` over (thread_id, sequence, prev_hash,
    /// canonical JSON of checkpoint).
    pub this_hash: String,
}

impl CheckpointRecord {
    /// The `prev_hash` of the first record in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// Every checkpoint a thread has saved, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointHistory {
    pub thread_id: String,
    pub records: Vec<CheckpointRecord>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the newest record. Empty if nothing was saved.
    pub head_hash: String,
}
