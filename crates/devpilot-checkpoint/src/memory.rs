//! In-memory implementation of `CheckpointStore`.
//!
//! `InMemoryCheckpointStore` keeps every checkpoint a thread has ever saved,
//! chained by SHA-256, behind a `Mutex`. `load` returns the newest one;
//! `history` and `verify_integrity` expose the full chain.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::Utc;
use tracing::debug;

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    execution::{Checkpoint, ThreadId},
};
use devpilot_core::traits::CheckpointStore;

use crate::{
    chain::{hash_record, verify_chain},
    record::{CheckpointHistory, CheckpointRecord},
};

// ── Internal mutable state ────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct ThreadChain {
    pub(crate) records: Vec<CheckpointRecord>,
}

impl ThreadChain {
    fn last_hash(&self) -> &str {
        self.records
            .last()
            .map(|r| r.this_hash.as_str())
            .unwrap_or(CheckpointRecord::GENESIS_HASH)
    }
}

// ── Public store ──────────────────────────────────────────────────────────────

/// An append-only, hash-chained checkpoint store held in memory.
///
/// Cloning shares the underlying chains.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    pub(crate) chains: Arc<Mutex<HashMap<ThreadId, ThreadChain>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export a thread's full chain, oldest first.
    pub fn history(&self, thread_id: &ThreadId) -> DevpilotResult<CheckpointHistory> {
        let chains = self.lock()?;
        let records = chains
            .get(thread_id)
            .map(|c| c.records.clone())
            .unwrap_or_default();
        let head_hash = records.last().map(|r| r.this_hash.clone()).unwrap_or_default();

        Ok(CheckpointHistory {
            thread_id: thread_id.to_string(),
            records,
            exported_at: Utc::now(),
            head_hash,
        })
    }

    /// True if the thread's chain has not been altered. A thread with no
    /// checkpoints is trivially intact.
    pub fn verify_integrity(&self, thread_id: &ThreadId) -> bool {
        match self.lock() {
            Ok(chains) => chains
                .get(thread_id)
                .map(|c| verify_chain(&c.records))
                .unwrap_or(true),
            Err(_) => false,
        }
    }

    pub fn threads(&self) -> Vec<ThreadId> {
        self.lock()
            .map(|chains| chains.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> DevpilotResult<MutexGuard<'_, HashMap<ThreadId, ThreadChain>>> {
        self.chains.lock().map_err(|e| DevpilotError::CheckpointFailed {
            reason: format!("checkpoint state lock poisoned: {}", e),
        })
    }
}

// ── CheckpointStore impl ──────────────────────────────────────────────────────

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self, thread_id: &ThreadId) -> DevpilotResult<Option<Checkpoint>> {
        let chains = self.lock()?;
        Ok(chains
            .get(thread_id)
            .and_then(|c| c.records.last())
            .map(|r| r.checkpoint.clone()))
    }

    /// Append `checkpoint` to its thread's chain.
    fn save(&self, checkpoint: &Checkpoint) -> DevpilotResult<()> {
        let mut chains = self.lock()?;
        let chain = chains.entry(checkpoint.thread_id.clone()).or_default();

        let thread_id = checkpoint.thread_id.to_string();
        let sequence = chain.records.len() as u64;
        let prev_hash = chain.last_hash().to_string();
        let this_hash = hash_record(&thread_id, sequence, checkpoint, &prev_hash)?;

        debug!(
            thread_id = %thread_id,
            sequence,
            version = checkpoint.version,
            hash = %this_hash,
            "checkpoint appended"
        );

        chain.records.push(CheckpointRecord {
            sequence,
            thread_id,
            checkpoint: checkpoint.clone(),
            prev_hash,
            this_hash,
        });
        Ok(())
    }
}
