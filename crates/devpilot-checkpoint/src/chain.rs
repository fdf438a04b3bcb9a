//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. thread_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of the checkpoint (serde_json, no pretty-printing)

use sha2::{Digest, Sha256};

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    execution::Checkpoint,
};

use crate::record::CheckpointRecord;

/// Compute the SHA-256 hash of one chain record. Returns lowercase hex.
pub fn hash_record(
    thread_id: &str,
    sequence: u64,
    checkpoint: &Checkpoint,
    prev_hash: &str,
) -> DevpilotResult<String> {
    let checkpoint_json = serde_json::to_vec(checkpoint).map_err(|e| DevpilotError::CheckpointFailed {
        reason: format!("checkpoint is not serializable: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(thread_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&checkpoint_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a thread's chain.
///
/// Valid when every record's `prev_hash` links to the record before it (or
/// `GENESIS_HASH`), every `this_hash` matches its recomputed value, and
/// sequence numbers run 0, 1, 2, … without gaps. An empty chain is valid.
pub fn verify_chain(records: &[CheckpointRecord]) -> bool {
    let mut expected_prev = CheckpointRecord::GENESIS_HASH.to_string();

    for (idx, record) in records.iter().enumerate() {
        if record.sequence != idx as u64 || record.prev_hash != expected_prev {
            return false;
        }

        match hash_record(&record.thread_id, record.sequence, &record.checkpoint, &record.prev_hash) {
            Ok(recomputed) if recomputed == record.this_hash => {}
            _ => return false,
        }

        expected_prev = record.this_hash.clone();
    }

    true
}
