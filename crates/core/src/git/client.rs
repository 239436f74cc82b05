//! Asynchronous `git` CLI client bound to one clone directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use git2::Repository;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::errors::{GitError, MergeError};

/// Captured result of a git invocation whose exit status is inspected by the caller.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Client that runs `git` subprocesses inside a clone directory.
///
/// The process's own working directory is never changed; every child is
/// spawned with `current_dir` set to the clone.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
    work_dir: PathBuf,
}

impl GitCli {
    /// Enter `clone_dir`: it must exist, be a directory, and be the root of a
    /// non-bare git working tree. No git process is spawned here.
    ///
    /// Only the working-tree root is accepted. A subdirectory of a clone is
    /// rejected rather than resolved upward, so a stray path can never land
    /// the merge in an enclosing repository.
    pub fn open(binary: impl Into<String>, clone_dir: impl AsRef<Path>) -> Result<Self, MergeError> {
        let path = clone_dir.as_ref();
        let directory_error = |detail: String| MergeError::DirectoryError {
            path: path.display().to_string(),
            detail,
        };

        if !path.exists() {
            return Err(directory_error("no such directory".into()));
        }
        if !path.is_dir() {
            return Err(directory_error("not a directory".into()));
        }
        let repo = Repository::open(path)
            .map_err(|e| directory_error(format!("not a git working tree: {}", e.message())))?;
        if repo.is_bare() {
            return Err(directory_error("bare repository has no working tree".into()));
        }

        info!(path = %path.display(), "entered clone directory");
        Ok(Self {
            binary: binary.into(),
            work_dir: path.to_path_buf(),
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The repository's common git directory (usually `<clone>/.git`).
    ///
    /// For a linked worktree this is the main repository's `.git`, not
    /// `.git/worktrees/<name>`; shared files such as `info/attributes` are
    /// only read from here.
    pub fn common_dir(&self) -> Result<PathBuf, GitError> {
        let repo = Repository::open(&self.work_dir)?;
        Ok(repo.commondir().to_path_buf())
    }

    /// `git checkout <branch> --force`, discarding local modifications.
    #[instrument(skip(self), fields(path = %self.work_dir.display()))]
    pub async fn checkout_force(&self, branch: &str) -> Result<(), MergeError> {
        let output = self.run_git(&["checkout", branch, "--force"], &[]).await?;
        if !output.success() {
            warn!(branch, exit_code = output.exit_code, stderr = %output.stderr, "checkout failed");
            return Err(MergeError::CheckoutFailed {
                branch: branch.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        debug!(branch, "forced checkout");
        Ok(())
    }

    /// `git merge --no-edit <strategy_args…> <branch>`.
    ///
    /// A non-zero exit status is returned as data, not as an error: it is
    /// how git reports conflicts.
    #[instrument(skip(self, envs), fields(path = %self.work_dir.display()))]
    pub async fn merge(
        &self,
        branch: &str,
        strategy_args: &[String],
        envs: &[(String, String)],
    ) -> Result<GitOutput, GitError> {
        let mut args: Vec<&str> = vec!["merge", "--no-edit"];
        args.extend(strategy_args.iter().map(String::as_str));
        args.push(branch);
        let output = self.run_git(&args, envs).await?;
        debug!(exit_code = output.exit_code, stdout = %output.stdout, "merge finished");
        Ok(output)
    }

    /// `git config --local <key> <value>`.
    pub async fn config_set_local(&self, key: &str, value: &str) -> Result<(), GitError> {
        let output = self.run_git(&["config", "--local", key, value], &[]).await?;
        if !output.success() {
            warn!(key, exit_code = output.exit_code, stderr = %output.stderr, "git config failed");
            return Err(GitError::CommandFailed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        debug!(key, value, "set local config");
        Ok(())
    }

    /// `git config --local --get <key>`; `None` when the key is unset.
    pub async fn config_get_local(&self, key: &str) -> Result<Option<String>, GitError> {
        let output = self.run_git(&["config", "--local", "--get", key], &[]).await?;
        match output.exit_code {
            0 => Ok(Some(output.stdout.trim_end().to_string())),
            // `git config --get` exits 1 for a missing key.
            1 => Ok(None),
            exit_code => Err(GitError::CommandFailed {
                exit_code,
                stderr: output.stderr,
            }),
        }
    }

    async fn run_git(&self, args: &[&str], envs: &[(String, String)]) -> Result<GitOutput, GitError> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.work_dir)
            .args(args)
            .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = ?format!("{} {}", self.binary, args.join(" ")), "running git command");
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GitError::BinaryNotFound(self.binary.clone())
            } else {
                GitError::IoError(e)
            }
        })?;

        Ok(GitOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
