//! # devpilot-contracts
//!
//! Shared types for the devpilot agent runtime.
//!
//! All crates in the workspace import from here. No orchestration logic lives
//! in this crate, only data definitions, transcript queries, and error types.

pub mod error;
pub mod execution;
pub mod message;
pub mod policy;
pub mod state;
pub mod tool;
pub mod verify;
