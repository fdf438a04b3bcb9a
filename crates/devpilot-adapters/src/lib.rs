//! # devpilot-adapters
//!
//! The outer edge of the devpilot runtime: everything that touches a
//! subprocess, the filesystem, or the network.
//!
//! - [`tools`] holds the `ToolAdapter` implementations behind the built-in
//!   catalog: CLI wrappers (`kubectl`, `docker`, `aws`, ...), file
//!   management, document retrieval, and Jira search.
//! - [`model`] holds `LanguageModel` clients: an OpenAI-compatible chat
//!   completions client and a scripted model for demos.
//! - [`catalog`] pairs the policy crate's tool catalog with adapters.
//! - [`scenarios`] wires real runtime components to fixture adapters and
//!   walks through the approval, retrieval, and compaction flows.
//!
//! Nothing in [`scenarios`] contacts an external system.

pub mod catalog;
pub mod error;
pub mod fixtures;
pub mod model;
pub mod scenarios;
pub mod tools;

pub use catalog::{builtin_registry, AdapterSettings};
pub use error::{AdapterError, AdapterResult};
