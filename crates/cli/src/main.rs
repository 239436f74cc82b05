//! mergeval command-line tool.
//!
//! Runs one merge tool against a branch pair of a clone and reports the
//! outcome through stdout diagnostics and the exit status, lists the
//! available tools, merges result caches, and generates / validates
//! configuration files.

mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mergeval_core::cache::merge_caches_with_progress;
use mergeval_core::config::{default_config_path, EvalConfig};
use mergeval_core::merge::{self, diagnostic, run_tool, MergeTool};
use mergeval_core::models::MergeReport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// mergeval command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "mergeval",
    version,
    about = "Run and compare git merge strategies on branch pairs"
)]
struct Cli {
    /// Path to the TOML configuration file (defaults apply when omitted).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check out <BRANCH1> in <CLONE_DIR> and merge <BRANCH2> with a tool.
    ///
    /// Exits 0 on a clean merge and non-zero on a conflict or setup failure.
    Run {
        /// Merge tool: a strategy name (see `mergeval tools`) or `hires`.
        tool: MergeTool,

        /// Existing git working tree to merge in.
        clone_dir: PathBuf,

        /// Branch checked out first (ours).
        branch1: String,

        /// Branch merged in (theirs).
        branch2: String,

        /// Also print a JSON result record.
        #[arg(long)]
        json: bool,
    },

    /// List the available merge tools.
    Tools,

    /// Merge several result caches into one.
    CacheMerge {
        /// Caches to merge, in precedence order for JSON keys.
        #[arg(required = true)]
        caches: Vec<PathBuf>,

        /// Output cache directory.
        #[arg(long, default_value = "cache")]
        output_cache: PathBuf,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./mergeval.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Init { output } => {
            init_logging("warn");
            cmd_init(&output).map(|()| 0)
        }
        Commands::Validate => {
            init_logging("warn");
            cmd_validate(cli.config.as_deref()).map(|()| 0)
        }
        command => {
            let config = EvalConfig::load_or_default(cli.config.as_deref())
                .context("failed to load configuration")?;
            init_logging(&config.logging.log_level);

            match command {
                Commands::Run {
                    tool,
                    clone_dir,
                    branch1,
                    branch2,
                    json,
                } => cmd_run(&config, tool, &clone_dir, &branch1, &branch2, json).await,
                Commands::Tools => {
                    cmd_tools(&config);
                    Ok(0)
                }
                Commands::CacheMerge {
                    caches,
                    output_cache,
                } => cmd_cache_merge(&caches, &output_cache).map(|()| 0),
                Commands::Init { .. } | Commands::Validate => unreachable!(),
            }
        }
    }
}

/// Logs go to stderr; stdout carries the diagnostics that log scrapers parse.
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_run(
    config: &EvalConfig,
    tool: MergeTool,
    clone_dir: &Path,
    branch1: &str,
    branch2: &str,
    json: bool,
) -> Result<u8> {
    info!(%tool, path = %clone_dir.display(), branch1, branch2, "running merge tool");
    let started_at = Utc::now();
    let timer = Instant::now();
    let result = run_tool(tool, clone_dir, branch1, branch2, config).await;
    let elapsed: Duration = timer.elapsed();
    info!(
        %tool,
        exit_code = merge::exit_code(&result),
        elapsed_ms = elapsed.as_millis() as u64,
        "merge tool finished"
    );

    if let Some(line) = diagnostic(tool.component(), &result) {
        println!("{}", line);
    }

    let report = MergeReport::from_result(
        tool.name(),
        tool.component(),
        clone_dir,
        branch1,
        branch2,
        &result,
        started_at,
        elapsed,
    );
    // Human-readable status on stderr; stdout stays parseable.
    eprintln!("{}", style::outcome(&report));

    if json {
        println!(
            "{}",
            serde_json::to_string(&report).context("failed to serialize merge report")?
        );
    }

    Ok(merge::exit_code(&result))
}

fn cmd_tools(config: &EvalConfig) {
    println!();
    println!("{}", style::header("Merge tools"));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Tool", "Component", "git merge arguments"]);

    for tool in MergeTool::all() {
        let args = match tool {
            MergeTool::Strategy(strategy) => strategy.args().join(" "),
            MergeTool::Hires => format!(
                "merge={} ({})",
                config.hires.driver_name, config.hires.driver_command
            ),
        };
        table.add_row(vec![
            Cell::new(tool.name()),
            Cell::new(tool.component()),
            Cell::new(&args),
        ]);
    }

    println!("{}", table);
    println!();
    println!(
        "{}",
        style::dim("Usage: mergeval run <tool> <clone_dir> <branch-1> <branch-2>")
    );
    println!();
}

fn cmd_cache_merge(caches: &[PathBuf], output_cache: &Path) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .context("invalid progress template")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message("Traversing caches...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let summary = merge_caches_with_progress(caches, output_cache, |path| {
        spinner.set_message(path.display().to_string());
    });
    spinner.finish_and_clear();
    let summary = summary.context("cache merge failed")?;

    println!(
        "{}",
        style::success(&format!("Merged {} caches into {}", caches.len(), output_cache.display()))
    );
    println!("  JSON entries merged : {}", summary.json_merged);
    println!("  Files copied        : {}", summary.files_copied);
    println!("  Skipped             : {}", summary.skipped);
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# mergeval configuration
# Every key is optional; the values below are the defaults.

[logging]
log_level = "warn"

[git]
binary = "git"

[hires]
driver_name = "git-hires-merge"
display_name = "An interactive merge driver for resolving conflicts on individual or adjacent lines"
driver_command = "git-hires-merge %O %A %B %L %P"
recursive = "binary"
conflict_style = "diff3"
non_interactive_env = "GIT_HIRES_MERGE_NON_INTERACTIVE_MODE"
non_interactive_value = "True"
# "ensure" writes the driver attribute once; "append" adds it on every run.
attributes_policy = "ensure"
"#;

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, DEFAULT_CONFIG).context("failed to write config file")?;

    println!("{}", style::success(&format!("Default configuration written to {}", output.display())));
    println!();
    println!("Next steps:");
    println!("  1. Point [hires].driver_command at your git-hires-merge installation");
    println!(
        "  2. Validate with: mergeval validate --config {}",
        output.display()
    );
    println!();
    Ok(())
}

fn cmd_validate(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path().context("cannot determine the default config directory")?,
    };
    println!("Validating configuration: {}", path.display());
    println!();

    let config = EvalConfig::load_from_file(&path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => println!("  [OK] All fields are valid"),
        Err(e) => {
            println!("  {}", style::error(&format!("Validation error: {}", e)));
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("{}", style::header("Configuration summary:"));
    println!("  git binary        : {}", config.git.binary);
    println!("  hires driver      : {}", config.hires.driver_name);
    println!("  driver command    : {}", config.hires.driver_command);
    println!("  conflict style    : {}", config.hires.conflict_style);
    println!(
        "  non-interactive   : {}={}",
        config.hires.non_interactive_env, config.hires.non_interactive_value
    );
    println!("  attributes policy : {:?}", config.hires.attributes_policy);
    println!();
    println!("{}", style::success("Configuration is valid"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use mergeval_core::merge::MergeStrategy;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "mergeval",
            "run",
            "ort-ignorespace",
            "/tmp/clone",
            "main",
            "feature",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                tool,
                clone_dir,
                branch1,
                branch2,
                json,
            } => {
                assert_eq!(tool, MergeTool::Strategy(MergeStrategy::OrtIgnorespace));
                assert_eq!(clone_dir, PathBuf::from("/tmp/clone"));
                assert_eq!(branch1, "main");
                assert_eq!(branch2, "feature");
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_tool() {
        let result = Cli::try_parse_from(["mergeval", "run", "octopus", "/tmp/c", "a", "b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config: EvalConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mergeval.toml");
        cmd_init(&path).unwrap();
        assert!(cmd_init(&path).is_err());
        cmd_validate(Some(&path)).unwrap();
    }
}
