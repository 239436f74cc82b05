//! Merge tools: strategy dispatch, the generic runner and the hires invoker.

pub mod hires;
pub mod runner;
pub mod strategy;

use std::path::Path;

pub use hires::HiresInvoker;
pub use runner::MergeRunner;
pub use strategy::{MergeStrategy, MergeTool, UnknownToolError};

pub use crate::models::{MergeOutcome, MergePhase, MergeRequest};

use crate::config::EvalConfig;
use crate::errors::MergeError;

/// Run `tool` on one branch pair: check out `branch1`, merge `branch2`.
pub async fn run_tool(
    tool: MergeTool,
    clone_dir: &Path,
    branch1: &str,
    branch2: &str,
    config: &EvalConfig,
) -> Result<MergeOutcome, MergeError> {
    match tool {
        MergeTool::Strategy(strategy) => {
            MergeRunner::from_config(config)
                .dispatch(strategy, clone_dir, branch1, branch2)
                .await
        }
        MergeTool::Hires => {
            HiresInvoker::from_config(config)
                .run(clone_dir, branch1, branch2)
                .await
        }
    }
}

/// The stdout line downstream log parsing keys on, or `None` for a clean merge.
pub fn diagnostic(component: &str, result: &Result<MergeOutcome, MergeError>) -> Option<String> {
    match result {
        Ok(MergeOutcome::Clean) => None,
        Ok(MergeOutcome::Conflict { .. }) => Some(format!("{component}: Conflict")),
        Err(MergeError::DirectoryError { path, .. }) => {
            Some(format!("{component}: cannot enter clone directory {path}"))
        }
        Err(MergeError::CheckoutFailed { branch, .. }) => {
            Some(format!("{component}: checkout of {branch} failed"))
        }
        Err(e) => Some(format!("{component}: {e}")),
    }
}

/// Process exit status for a tool result.
pub fn exit_code(result: &Result<MergeOutcome, MergeError>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => e.exit_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_lines() {
        assert_eq!(diagnostic("gitmerge_ort", &Ok(MergeOutcome::Clean)), None);
        assert_eq!(
            diagnostic("git_hires_merge", &Ok(MergeOutcome::Conflict { exit_code: 1 })),
            Some("git_hires_merge: Conflict".to_string())
        );
        let err = Err(MergeError::DirectoryError {
            path: "/nonexistent".into(),
            detail: "no such directory".into(),
        });
        assert_eq!(
            diagnostic("gitmerge_ort", &err),
            Some("gitmerge_ort: cannot enter clone directory /nonexistent".to_string())
        );
        assert_eq!(exit_code(&err), 2);
    }

    #[tokio::test]
    async fn test_run_tool_reports_directory_error_for_every_tool() {
        let config = EvalConfig::default();
        for tool in MergeTool::all() {
            let result = run_tool(tool, Path::new("/nonexistent"), "main", "feature", &config).await;
            assert!(
                matches!(result, Err(MergeError::DirectoryError { .. })),
                "{tool} should fail on a missing clone"
            );
        }
    }
}
