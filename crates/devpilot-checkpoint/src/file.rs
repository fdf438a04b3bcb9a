//! File-backed implementation of `CheckpointStore`.
//!
//! One JSON document per thread under a state directory. Saves write a
//! temporary sibling file and rename it over the old one, so a crash never
//! leaves a half-written checkpoint behind.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    execution::{Checkpoint, ThreadId},
};
use devpilot_core::traits::CheckpointStore;

#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Use `dir` as the state directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> DevpilotResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| failed(format!(
            "cannot create state directory '{}': {}",
            dir.display(),
            e
        )))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file holding `thread_id`'s checkpoint.
    ///
    /// Ids made only of ASCII letters, digits, `-` and `_` are used as the
    /// file stem directly; anything else is hex-encoded with an `x-` prefix.
    pub fn path_for(&self, thread_id: &ThreadId) -> PathBuf {
        let id = thread_id.0.as_str();
        let plain = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        let stem = if plain && !id.starts_with("x-") {
            id.to_string()
        } else {
            format!("x-{}", hex::encode(id))
        };
        self.dir.join(format!("{stem}.json"))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, thread_id: &ThreadId) -> DevpilotResult<Option<Checkpoint>> {
        let path = self.path_for(thread_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| failed(format!("cannot read '{}': {}", path.display(), e)))?;
        let checkpoint = serde_json::from_str(&contents)
            .map_err(|e| failed(format!("corrupt checkpoint '{}': {}", path.display(), e)))?;
        Ok(Some(checkpoint))
    }

    fn save(&self, checkpoint: &Checkpoint) -> DevpilotResult<()> {
        let path = self.path_for(&checkpoint.thread_id);
        let tmp = path.with_extension("json.tmp");

        let body = serde_json::to_vec_pretty(checkpoint)
            .map_err(|e| failed(format!("checkpoint is not serializable: {}", e)))?;
        fs::write(&tmp, body).map_err(|e| failed(format!("cannot write '{}': {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| failed(format!("cannot replace '{}': {}", path.display(), e)))?;

        debug!(
            thread_id = %checkpoint.thread_id,
            version = checkpoint.version,
            path = %path.display(),
            "checkpoint written"
        );
        Ok(())
    }
}

fn failed(reason: String) -> DevpilotError {
    DevpilotError::CheckpointFailed { reason }
}
