//! # devpilot-core
//!
//! The approval-gated orchestration graph for the devpilot agent runtime.
//!
//! This crate provides:
//! - The external contracts (`LanguageModel`, `ToolAdapter`,
//!   `ApprovalPolicy`, `ArgumentVerifier`, `CheckpointStore`,
//!   `StateBroadcaster`)
//! - The router, the node bodies, and the `GraphEngine` that drives them
//! - `AgentConfig` and the `ToolRegistry`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devpilot_core::{AgentConfig, GraphEngine, ToolRegistry};
//! ```

pub mod config;
pub mod engine;
pub mod nodes;
pub mod prompt;
pub mod registry;
pub mod router;
pub mod traits;

pub use config::AgentConfig;
pub use engine::GraphEngine;
pub use registry::ToolRegistry;
