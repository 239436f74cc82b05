//! Generic merge runner: one forced checkout, one `git merge`.

use std::path::Path;

use tracing::{info, instrument, warn};

use super::strategy::MergeStrategy;
use crate::config::EvalConfig;
use crate::errors::MergeError;
use crate::git::GitCli;
use crate::models::{MergeOutcome, MergePhase, MergeRequest};

/// Runs a single merge attempt with caller-supplied strategy arguments.
///
/// There are no retries; trying another strategy is the caller's decision.
#[derive(Debug, Clone)]
pub struct MergeRunner {
    git_binary: String,
}

impl MergeRunner {
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        Self::new(config.git.binary.clone())
    }

    /// Check out `base_branch` (discarding local changes) and merge
    /// `other_branch` into it.
    ///
    /// A clone directory that cannot be entered fails before any git command runs.
    #[instrument(skip(self, request), fields(
        path = %request.repository_path.display(),
        base = %request.base_branch,
        other = %request.other_branch,
    ))]
    pub async fn run(&self, request: &MergeRequest) -> Result<MergeOutcome, MergeError> {
        let phase = MergePhase::Start;
        let git = match GitCli::open(self.git_binary.clone(), &request.repository_path) {
            Ok(git) => git,
            Err(e) => {
                phase.advance(MergePhase::DirectoryError)?;
                warn!(error = %e, "clone directory unusable");
                return Err(e);
            }
        };
        let phase = phase.advance(MergePhase::DirectoryEntered)?;

        git.checkout_force(&request.base_branch).await?;
        let phase = phase.advance(MergePhase::BranchOneCheckedOut)?;

        let output = git
            .merge(&request.other_branch, &request.strategy_args, &[])
            .await?;
        let phase = phase.advance(MergePhase::MergeAttempted)?;

        let outcome = MergeOutcome::from_exit_code(output.exit_code);
        phase.advance(outcome.phase())?;
        info!(
            ?outcome,
            work_dir = %git.work_dir().display(),
            args = ?request.strategy_args,
            "merge attempt finished"
        );
        Ok(outcome)
    }

    /// Build the request for a named strategy and run it.
    pub async fn dispatch(
        &self,
        strategy: MergeStrategy,
        clone_dir: &Path,
        branch1: &str,
        branch2: &str,
    ) -> Result<MergeOutcome, MergeError> {
        let request = MergeRequest::new(clone_dir, branch1, branch2, strategy.args());
        self.run(&request).await
    }
}
