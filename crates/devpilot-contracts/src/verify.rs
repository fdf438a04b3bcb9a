//! Tool argument verification report types.
//!
//! Before a call is dispatched, its arguments are checked against the tool's
//! declared schema. Only a passing `ArgumentReport` lets the adapter run.

use serde::{Deserialize, Serialize};

/// The result of checking one call's arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentReport {
    /// True only if every check passed.
    pub passed: bool,
    /// All failures collected during this run. Empty on pass.
    pub failures: Vec<ArgumentFailure>,
}

impl ArgumentReport {
    pub fn pass() -> Self {
        Self {
            passed: true,
            failures: Vec::new(),
        }
    }

    /// All failure messages joined into one line.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}] {}", f.rule_id, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentFailure {
    pub rule_id: String,
    pub message: String,
}
