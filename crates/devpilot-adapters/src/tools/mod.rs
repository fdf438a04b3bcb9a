//! `ToolAdapter` implementations for the built-in catalog.

pub mod cli;
pub mod file;
pub mod jira;
pub mod retrieval;

pub use cli::{ArgSplit, CliTool, Preflight};
pub use file::FileManageTool;
pub use jira::{JiraConfig, JiraTool};
pub use retrieval::{Document, DocumentRetriever, KeywordRetriever, RetrievalTool};

use devpilot_contracts::message::Arguments;

/// The string argument `key`, if present.
pub(crate) fn string_arg<'a>(arguments: &'a Arguments, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(|v| v.as_str())
}
