//! TOML-based configuration for mergeval.
//!
//! Every section is optional; a missing file or section falls back to the
//! defaults used by the evaluation scripts (`git` on `$PATH`, the
//! `git-hires-merge` driver in non-interactive mode, `diff3` conflict style).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Git binary settings.
    #[serde(default)]
    pub git: GitConfig,

    /// Hires merge driver settings.
    #[serde(default)]
    pub hires: HiresConfig,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

/// Git binary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Executable name or path of `git`.
    #[serde(default = "default_git_binary")]
    pub binary: String,
}

fn default_git_binary() -> String {
    "git".into()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hires driver
// ---------------------------------------------------------------------------

/// How the catch-all driver line is written to `.git/info/attributes`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttributesPolicy {
    /// Add the line only when an identical line is not already present.
    #[default]
    Ensure,
    /// Always append, duplicating the line on repeated runs.
    Append,
}

/// Settings for the line-level `git-hires-merge` driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiresConfig {
    /// Driver identifier used in `merge=<name>` and `merge.<name>.*` keys.
    #[serde(default = "default_driver_name")]
    pub driver_name: String,

    /// Human-readable driver description (`merge.<name>.name`).
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Driver command template (`merge.<name>.driver`).
    #[serde(default = "default_driver_command")]
    pub driver_command: String,

    /// Recursive-merge fallback (`merge.<name>.recursive`).
    #[serde(default = "default_recursive")]
    pub recursive: String,

    /// Repository conflict style (`merge.conflictstyle`).
    #[serde(default = "default_conflict_style")]
    pub conflict_style: String,

    /// Environment variable that switches the driver to non-interactive mode.
    #[serde(default = "default_non_interactive_env")]
    pub non_interactive_env: String,

    /// Value given to `non_interactive_env`.
    #[serde(default = "default_non_interactive_value")]
    pub non_interactive_value: String,

    /// Attributes-file write policy.
    #[serde(default)]
    pub attributes_policy: AttributesPolicy,
}

fn default_driver_name() -> String {
    "git-hires-merge".into()
}
fn default_display_name() -> String {
    "An interactive merge driver for resolving conflicts on individual or adjacent lines".into()
}
fn default_driver_command() -> String {
    "git-hires-merge %O %A %B %L %P".into()
}
fn default_recursive() -> String {
    "binary".into()
}
fn default_conflict_style() -> String {
    "diff3".into()
}
fn default_non_interactive_env() -> String {
    "GIT_HIRES_MERGE_NON_INTERACTIVE_MODE".into()
}
fn default_non_interactive_value() -> String {
    "True".into()
}

impl Default for HiresConfig {
    fn default() -> Self {
        Self {
            driver_name: default_driver_name(),
            display_name: default_display_name(),
            driver_command: default_driver_command(),
            recursive: default_recursive(),
            conflict_style: default_conflict_style(),
            non_interactive_env: default_non_interactive_env(),
            non_interactive_value: default_non_interactive_value(),
            attributes_policy: AttributesPolicy::default(),
        }
    }
}

const CONFLICT_STYLES: &[&str] = &["merge", "diff3", "zdiff3"];

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl EvalConfig {
    /// Load an [`EvalConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: EvalConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.git.binary, "git.binary")?;
        require_non_empty(&self.hires.driver_name, "hires.driver_name")?;
        require_non_empty(&self.hires.driver_command, "hires.driver_command")?;
        require_non_empty(&self.hires.non_interactive_env, "hires.non_interactive_env")?;

        if self.hires.driver_name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "hires.driver_name".into(),
                detail: "driver name must not contain whitespace".into(),
            });
        }
        if !CONFLICT_STYLES.contains(&self.hires.conflict_style.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "hires.conflict_style".into(),
                detail: format!(
                    "'{}' is not one of {}",
                    self.hires.conflict_style,
                    CONFLICT_STYLES.join(", ")
                ),
            });
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the default location when it exists,
    /// otherwise built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load_and_validate(p),
            None => match default_config_path() {
                Some(p) if p.exists() => Self::load_and_validate(p),
                _ => {
                    debug!("no configuration file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }
}

/// `~/.config/mergeval/config.toml` (platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mergeval").join("config.toml"))
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: "must not be empty".into(),
        });
    }
    Ok(())
}
