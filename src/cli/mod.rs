//! CLI definition and handler

use anyhow::Result;
use clap::Parser;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{load_config_file, load_project_config, ProjectConfig};
use crate::git::GitCli;
use crate::pipeline::analyze_repository;
use crate::reporters::{self, OutputFormat, OwnershipReport};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Who owns the lines of this repository, per author and per day
#[derive(Parser, Debug)]
#[command(name = "superblame")]
#[command(
    version,
    about = "Line ownership statistics from git blame, per author and per day",
    after_help = "\
Examples:
  superblame .                          Blame every tracked file
  superblame . -p '*.cs' -p '*.ts'      Only C# and TypeScript sources
  superblame . --format json --no-days  Author table as JSON"
)]
pub struct Cli {
    /// Path to repository (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Config file (default: <repo>/superblame.toml if present)
    #[arg(long, env = "SUPERBLAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pathspec of files to blame; repeatable (overrides config patterns)
    #[arg(short, long = "pattern")]
    pub patterns: Vec<String>,

    /// Revision to blame at
    #[arg(long)]
    pub rev: Option<String>,

    /// Number of parallel blame workers (1-64)
    #[arg(long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Per-file results folded together before merging into the total
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Count whitespace-only changes as authorship
    #[arg(long)]
    pub keep_whitespace: bool,

    /// Additional import commit to exclude; repeatable
    #[arg(long = "import-commit")]
    pub import_commits: Vec<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Show only the top N authors
    #[arg(long)]
    pub top: Option<usize>,

    /// Omit the per-day table
    #[arg(long)]
    pub no_days: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,
}

/// Open the repository containing `path` and load its settings.
///
/// `path` may be any directory inside the work tree; the project config is
/// read from the repository root unless `config_file` names one explicitly.
pub fn open_repository(path: &Path, config_file: Option<&Path>) -> Result<(GitCli, ProjectConfig)> {
    let git = GitCli::open(path)?;
    let config = match config_file {
        Some(file) => load_config_file(file)?,
        None => load_project_config(git.repo_path()),
    };
    Ok((git, config))
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let (git, config) = open_repository(&cli.path, cli.config.as_deref())?;
    let git = git
        .with_revision(cli.rev.clone().unwrap_or_else(|| config.blame.revision.clone()))?
        .with_ignore_whitespace(config.blame.ignore_whitespace && !cli.keep_whitespace);

    let patterns = if cli.patterns.is_empty() {
        config.blame.patterns.clone()
    } else {
        cli.patterns.clone()
    };
    let filter = config.import_filter(&cli.import_commits);
    debug!("{} import commits excluded", filter.len());

    let mut pipeline_config = config.pipeline_config();
    if let Some(workers) = cli.workers {
        pipeline_config = pipeline_config.with_workers(workers);
    }
    if let Some(batch_size) = cli.batch_size {
        pipeline_config = pipeline_config.with_batch_size(batch_size);
    }

    let bar = if cli.no_progress || !Term::stderr().is_term() {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(create_bar_style());
        bar.set_message("blaming");
        bar
    };
    let progress = |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    };

    let output = analyze_repository(
        Arc::new(git),
        &patterns,
        Arc::new(filter),
        &pipeline_config,
        Some(&progress),
    )?;
    bar.finish_and_clear();
    info!("{} files blamed", output.stats.files_blamed);

    let report = OwnershipReport::new(
        &output.total,
        output.stats,
        &config.author_aliases(),
        cli.top,
        !cli.no_days,
    );
    println!("{}", reporters::report(&report, cli.format)?);
    Ok(())
}

/// Create bar progress style
fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers_bounds() {
        assert_eq!(parse_workers("12"), Ok(12));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "superblame",
            "repo",
            "-p",
            "*.cs",
            "-p",
            "*.ts",
            "--workers",
            "4",
            "--format",
            "json",
            "--import-commit",
            "93ba65338271090e9bdb8df4481b11b091a7acab",
            "--no-days",
        ])
        .unwrap();

        assert_eq!(cli.path, PathBuf::from("repo"));
        assert_eq!(cli.patterns, vec!["*.cs", "*.ts"]);
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.no_days);
        assert_eq!(cli.log_level, "warn");
    }
}
