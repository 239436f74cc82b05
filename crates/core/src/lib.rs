//! mergeval core library.
//!
//! This crate provides the pieces of the merge-strategy evaluation harness:
//! configuration, a `git` subprocess client, the merge tools under evaluation
//! (fixed-strategy dispatch, the generic runner and the hires driver invoker),
//! JSON run reports, and merging of result caches.

pub mod cache;
pub mod config;
pub mod errors;
pub mod git;
pub mod merge;
pub mod models;

// Re-exports for convenience.
pub use config::EvalConfig;
pub use errors::{CoreError, MergeError};
pub use merge::{run_tool, MergeOutcome, MergeTool};
