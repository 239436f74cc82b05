//! Error types for the mergeval core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from invoking the `git` binary or inspecting a repository.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// A `git` command exited with a non-zero status.
    #[error("git command failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Merge errors
// ---------------------------------------------------------------------------

/// Errors that stop a merge attempt before a merge result exists.
///
/// A merge that ran and produced conflicts is *not* an error; it is reported
/// as [`MergeOutcome::Conflict`](crate::merge::MergeOutcome::Conflict).
#[derive(Debug, Error)]
pub enum MergeError {
    /// The clone directory is missing, not a directory, or not a git working tree.
    #[error("cannot enter clone directory '{path}': {detail}")]
    DirectoryError { path: String, detail: String },

    /// Forcing the checkout of the first branch failed.
    #[error("checkout of '{branch}' failed (exit {exit_code}): {stderr}")]
    CheckoutFailed {
        branch: String,
        exit_code: i32,
        stderr: String,
    },

    /// A merge-driver setup step failed. Earlier steps are not rolled back.
    #[error("merge driver setup failed at {step}: {detail}")]
    DriverSetupFailed { step: String, detail: String },

    /// A merge-phase transition was invalid.
    #[error("invalid merge phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Underlying git error.
    #[error("merge git error: {0}")]
    Git(#[from] GitError),
}

impl MergeError {
    /// Process exit status reported to the caller for this failure.
    ///
    /// Git failures propagate git's own status; a clone directory that cannot
    /// be entered always reports `2`.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::DirectoryError { .. } => 2,
            Self::CheckoutFailed { exit_code, .. }
            | Self::Git(GitError::CommandFailed { exit_code, .. }) => clamp_exit_code(*exit_code),
            _ => 1,
        }
    }
}

/// Map a child exit status onto a non-zero process exit code.
pub(crate) fn clamp_exit_code(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(0) | Err(_) => 1,
        Ok(c) => c,
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Cache errors
// ---------------------------------------------------------------------------

/// Errors from merging result caches.
#[derive(Debug, Error)]
pub enum CacheError {
    /// One of the input caches does not exist.
    #[error("cache directory not found: {0}")]
    SourceNotFound(String),

    /// A cache entry could not be parsed or serialized as JSON.
    #[error("invalid JSON in cache entry '{path}': {detail}")]
    Json { path: String, detail: String },

    /// A JSON cache entry is not a top-level object and cannot be merged.
    #[error("cache entry '{0}' is not a JSON object")]
    NotAnObject(String),

    /// Generic I/O error.
    #[error("cache I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = MergeError::DirectoryError {
            path: "/nonexistent".into(),
            detail: "no such directory".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot enter clone directory '/nonexistent': no such directory"
        );

        let err = GitError::CommandFailed {
            exit_code: 128,
            stderr: "fatal: not a git repository".into(),
        };
        assert!(err.to_string().contains("exit 128"));

        let err = ConfigError::InvalidValue {
            field: "hires.driver_name".into(),
            detail: "must not be empty".into(),
        };
        assert!(err.to_string().contains("hires.driver_name"));
    }

    #[test]
    fn test_exit_codes() {
        let dir = MergeError::DirectoryError {
            path: "/x".into(),
            detail: "missing".into(),
        };
        assert_eq!(dir.exit_code(), 2);

        let checkout = MergeError::CheckoutFailed {
            branch: "main".into(),
            exit_code: 1,
            stderr: String::new(),
        };
        assert_eq!(checkout.exit_code(), 1);

        let git = MergeError::Git(GitError::CommandFailed {
            exit_code: 128,
            stderr: String::new(),
        });
        assert_eq!(git.exit_code(), 128);

        let signalled = MergeError::Git(GitError::CommandFailed {
            exit_code: -1,
            stderr: String::new(),
        });
        assert_eq!(signalled.exit_code(), 1);
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let merge_err = MergeError::InvalidTransition {
            from: "start".into(),
            to: "clean".into(),
        };
        let core_err: CoreError = merge_err.into();
        assert!(matches!(core_err, CoreError::Merge(_)));

        let cache_err = CacheError::NotAnObject("a.json".into());
        let core_err: CoreError = cache_err.into();
        assert!(matches!(core_err, CoreError::Cache(_)));
    }
}
