//! # devpilot-verify
//!
//! Tool argument verification for the devpilot runtime.
//!
//! This crate provides [`engine::SchemaArgumentVerifier`], which implements
//! [`devpilot_core::traits::ArgumentVerifier`]. Arguments are checked in two
//! phases before any adapter runs:
//!
//! 1. **Structural**: the arguments object is validated against the tool's
//!    `parameters` JSON Schema via the `jsonschema` crate.
//! 2. **Custom**: rules registered per tool name are evaluated in order.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use devpilot_verify::engine::{forbid_substring, SchemaArgumentVerifier};
//!
//! let mut verifier = SchemaArgumentVerifier::new();
//! verifier.register_rule("kubectl_exec", "no-all-namespaces",
//!     forbid_substring("command", "--all-namespaces"));
//! ```

pub mod engine;

pub use engine::{forbid_substring, ArgumentRuleFn, SchemaArgumentVerifier};
