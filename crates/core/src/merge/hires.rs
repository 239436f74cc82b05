//! Merging through the line-level `git-hires-merge` driver.
//!
//! Before merging, the driver is registered in the clone: a catch-all
//! `* merge=<driver>` line in `.git/info/attributes` plus the
//! `merge.<driver>.*` and `merge.conflictstyle` local config keys. These
//! changes stay in the clone after the run, whatever the outcome.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::config::{AttributesPolicy, EvalConfig, HiresConfig};
use crate::errors::MergeError;
use crate::git::GitCli;
use crate::models::{MergeOutcome, MergePhase};

/// Configures the hires driver in a clone and runs one merge through it.
#[derive(Debug, Clone)]
pub struct HiresInvoker {
    git_binary: String,
    config: HiresConfig,
}

impl HiresInvoker {
    pub fn new(git_binary: impl Into<String>, config: HiresConfig) -> Self {
        Self {
            git_binary: git_binary.into(),
            config,
        }
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        Self::new(config.git.binary.clone(), config.hires.clone())
    }

    /// The catch-all attributes line, e.g. `* merge=git-hires-merge`.
    pub fn attribute_line(&self) -> String {
        format!("* merge={}", self.config.driver_name)
    }

    /// Environment handed to the merge child so the driver never prompts.
    pub fn driver_env(&self) -> Vec<(String, String)> {
        vec![(
            self.config.non_interactive_env.clone(),
            self.config.non_interactive_value.clone(),
        )]
    }

    /// Local config entries written before the merge, in order.
    pub fn driver_config_entries(&self) -> Vec<(String, String)> {
        let driver = &self.config.driver_name;
        vec![
            (format!("merge.{driver}.name"), self.config.display_name.clone()),
            (format!("merge.{driver}.driver"), self.config.driver_command.clone()),
            (format!("merge.{driver}.recursive"), self.config.recursive.clone()),
            ("merge.conflictstyle".to_string(), self.config.conflict_style.clone()),
        ]
    }

    /// Check out `branch1`, register the driver, and merge `branch2`.
    #[instrument(skip(self), fields(driver = %self.config.driver_name))]
    pub async fn run(
        &self,
        clone_dir: &Path,
        branch1: &str,
        branch2: &str,
    ) -> Result<MergeOutcome, MergeError> {
        let phase = MergePhase::Start;
        let git = match GitCli::open(self.git_binary.clone(), clone_dir) {
            Ok(git) => git,
            Err(e) => {
                phase.advance(MergePhase::DirectoryError)?;
                warn!(error = %e, "clone directory unusable");
                return Err(e);
            }
        };
        let phase = phase.advance(MergePhase::DirectoryEntered)?;

        git.checkout_force(branch1).await?;
        let phase = phase.advance(MergePhase::BranchOneCheckedOut)?;

        self.register_driver(&git).await?;

        let output = git.merge(branch2, &[], &self.driver_env()).await?;
        let phase = phase.advance(MergePhase::MergeAttempted)?;

        let outcome = MergeOutcome::from_exit_code(output.exit_code);
        phase.advance(outcome.phase())?;
        if outcome.conflict() {
            warn!(exit_code = output.exit_code, "hires merge left conflicts");
        } else {
            info!("hires merge clean");
        }
        Ok(outcome)
    }

    async fn register_driver(&self, git: &GitCli) -> Result<(), MergeError> {
        let attributes = git
            .common_dir()
            .map_err(|e| setup_failed("attributes", e))?
            .join("info")
            .join("attributes");
        let written = register_attribute(
            &attributes,
            &self.attribute_line(),
            self.config.attributes_policy,
        )
        .map_err(|e| setup_failed("attributes", e))?;
        debug!(path = %attributes.display(), written, "driver attribute registered");

        for (key, value) in self.driver_config_entries() {
            git.config_set_local(&key, &value)
                .await
                .map_err(|e| setup_failed(&key, e))?;
        }
        Ok(())
    }
}

fn setup_failed(step: &str, err: impl std::fmt::Display) -> MergeError {
    MergeError::DriverSetupFailed {
        step: step.to_string(),
        detail: err.to_string(),
    }
}

/// Write `line` to the attributes file at `path` according to `policy`.
///
/// Returns whether the file was modified. Missing parent directories are
/// created, and a missing trailing newline in the existing file is repaired
/// before appending.
pub fn register_attribute(
    path: &Path,
    line: &str,
    policy: AttributesPolicy,
) -> std::io::Result<bool> {
    let existing = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    if policy == AttributesPolicy::Ensure && existing.lines().any(|l| l.trim() == line) {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{line}")?;
    Ok(true)
}
