//! Domain model types used throughout mergeval.
//!
//! These types bridge the merge tools, the CLI and the JSON result records
//! collected by the evaluation orchestrator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{clamp_exit_code, MergeError};

// ---------------------------------------------------------------------------
// Merge request / outcome
// ---------------------------------------------------------------------------

/// A single merge attempt: check out `base_branch`, merge `other_branch` into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub repository_path: PathBuf,
    pub base_branch: String,
    pub other_branch: String,
    /// Passed through to `git merge` untouched.
    pub strategy_args: Vec<String>,
}

impl MergeRequest {
    pub fn new(
        repository_path: impl Into<PathBuf>,
        base_branch: impl Into<String>,
        other_branch: impl Into<String>,
        strategy_args: Vec<String>,
    ) -> Self {
        Self {
            repository_path: repository_path.into(),
            base_branch: base_branch.into(),
            other_branch: other_branch.into(),
            strategy_args,
        }
    }
}

/// Result of a merge that was actually attempted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    Clean,
    /// `git merge` exited non-zero; `exit_code` is its status (-1 if killed by a signal).
    Conflict { exit_code: i32 },
}

impl MergeOutcome {
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            Self::Clean
        } else {
            Self::Conflict { exit_code }
        }
    }

    pub fn conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Process exit status reported to the caller.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Conflict { exit_code } => clamp_exit_code(*exit_code),
        }
    }

    /// Terminal phase this outcome corresponds to.
    pub fn phase(&self) -> MergePhase {
        match self {
            Self::Clean => MergePhase::Clean,
            Self::Conflict { .. } => MergePhase::Conflict,
        }
    }
}

// ---------------------------------------------------------------------------
// Merge phase
// ---------------------------------------------------------------------------

/// Progress of one merge attempt.
///
/// `Start → DirectoryEntered → BranchOneCheckedOut → MergeAttempted → {Clean | Conflict}`,
/// or `Start → DirectoryError`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergePhase {
    Start,
    DirectoryEntered,
    BranchOneCheckedOut,
    MergeAttempted,
    Clean,
    Conflict,
    DirectoryError,
}

impl MergePhase {
    pub fn can_advance_to(self, next: MergePhase) -> bool {
        use MergePhase::*;
        matches!(
            (self, next),
            (Start, DirectoryEntered)
                | (Start, DirectoryError)
                | (DirectoryEntered, BranchOneCheckedOut)
                | (BranchOneCheckedOut, MergeAttempted)
                | (MergeAttempted, Clean)
                | (MergeAttempted, Conflict)
        )
    }

    /// Move to `next`, rejecting out-of-order transitions.
    pub fn advance(self, next: MergePhase) -> Result<MergePhase, MergeError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(MergeError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl std::fmt::Display for MergePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::DirectoryEntered => write!(f, "directory_entered"),
            Self::BranchOneCheckedOut => write!(f, "branch_one_checked_out"),
            Self::MergeAttempted => write!(f, "merge_attempted"),
            Self::Clean => write!(f, "clean"),
            Self::Conflict => write!(f, "conflict"),
            Self::DirectoryError => write!(f, "directory_error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge report
// ---------------------------------------------------------------------------

/// Coarse classification of a tool run for the results dataset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    Clean,
    Conflict,
    DirectoryError,
    SetupError,
}

impl std::fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Conflict => write!(f, "conflict"),
            Self::DirectoryError => write!(f, "directory_error"),
            Self::SetupError => write!(f, "setup_error"),
        }
    }
}

/// One JSON record per (repository, branch pair, tool) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub tool: String,
    pub component: String,
    pub repository: PathBuf,
    pub branch1: String,
    pub branch2: String,
    pub outcome: ReportOutcome,
    pub exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl MergeReport {
    /// Build a report from the result of a tool run.
    #[allow(clippy::too_many_arguments)]
    pub fn from_result(
        tool: &str,
        component: &str,
        repository: &Path,
        branch1: &str,
        branch2: &str,
        result: &Result<MergeOutcome, MergeError>,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let (outcome, exit_code, detail) = match result {
            Ok(MergeOutcome::Clean) => (ReportOutcome::Clean, 0, None),
            Ok(o @ MergeOutcome::Conflict { .. }) => (ReportOutcome::Conflict, o.exit_code(), None),
            Err(e @ MergeError::DirectoryError { .. }) => {
                (ReportOutcome::DirectoryError, e.exit_code(), Some(e.to_string()))
            }
            Err(e) => (ReportOutcome::SetupError, e.exit_code(), Some(e.to_string())),
        };

        Self {
            tool: tool.to_string(),
            component: component.to_string(),
            repository: repository.to_path_buf(),
            branch1: branch1.to_string(),
            branch2: branch2.to_string(),
            outcome,
            exit_code,
            detail,
            started_at,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_exit_code() {
        assert_eq!(MergeOutcome::from_exit_code(0), MergeOutcome::Clean);
        let conflict = MergeOutcome::from_exit_code(1);
        assert!(conflict.conflict());
        assert_eq!(conflict.exit_code(), 1);
        assert_eq!(MergeOutcome::from_exit_code(-1).exit_code(), 1);
        assert_eq!(MergeOutcome::Clean.exit_code(), 0);
    }

    #[test]
    fn test_phase_happy_path() {
        let phase = MergePhase::Start
            .advance(MergePhase::DirectoryEntered)
            .and_then(|p| p.advance(MergePhase::BranchOneCheckedOut))
            .and_then(|p| p.advance(MergePhase::MergeAttempted))
            .and_then(|p| p.advance(MergePhase::Conflict))
            .unwrap();
        assert_eq!(phase, MergePhase::Conflict);
        assert!(phase.advance(MergePhase::Clean).is_err());
    }

    #[test]
    fn test_phase_rejects_out_of_order() {
        assert!(MergePhase::Start.advance(MergePhase::MergeAttempted).is_err());
        assert!(MergePhase::DirectoryEntered.advance(MergePhase::Clean).is_err());
        assert!(MergePhase::DirectoryError.advance(MergePhase::DirectoryEntered).is_err());
        assert!(MergePhase::Clean.advance(MergePhase::Conflict).is_err());

        let err = MergePhase::Start.advance(MergePhase::Clean).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid merge phase transition from start to clean"
        );
    }

    #[test]
    fn test_directory_error_only_reachable_from_start() {
        assert!(MergePhase::Start.can_advance_to(MergePhase::DirectoryError));
        assert!(!MergePhase::DirectoryEntered.can_advance_to(MergePhase::DirectoryError));
        assert!(!MergePhase::DirectoryError.can_advance_to(MergePhase::BranchOneCheckedOut));
    }

    #[test]
    fn test_report_serialization() {
        let result: Result<MergeOutcome, MergeError> = Ok(MergeOutcome::Conflict { exit_code: 1 });
        let report = MergeReport::from_result(
            "ort",
            "gitmerge_ort",
            Path::new("/tmp/clone"),
            "main",
            "feature",
            &result,
            Utc::now(),
            Duration::from_millis(42),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "conflict");
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["duration_ms"], 42);
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn test_report_directory_error() {
        let result: Result<MergeOutcome, MergeError> = Err(MergeError::DirectoryError {
            path: "/nonexistent".into(),
            detail: "no such directory".into(),
        });
        let report = MergeReport::from_result(
            "hires",
            "git_hires_merge",
            Path::new("/nonexistent"),
            "main",
            "feature",
            &result,
            Utc::now(),
            Duration::ZERO,
        );
        assert_eq!(report.outcome, ReportOutcome::DirectoryError);
        assert_eq!(report.exit_code, 2);
        assert!(report.detail.unwrap().contains("/nonexistent"));
    }
}
