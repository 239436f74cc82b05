//! Git operations for mergeval.

pub mod client;

pub use client::{GitCli, GitOutput};
