//! Project-level configuration support

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::authors::AuthorAliases;
use crate::git::ImportFilter;
use crate::pipeline::{PipelineConfig, DEFAULT_GENERATED_SUFFIX};

pub const CONFIG_FILE_NAME: &str = "superblame.toml";

/// Contents of `superblame.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub blame: BlameSettings,
    pub pipeline: PipelineSettings,
    /// Raw author identity -> display name
    pub authors: BTreeMap<String, String>,
}

/// `[blame]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlameSettings {
    /// Revision to blame at
    pub revision: String,
    /// Pass `-w` to git blame
    pub ignore_whitespace: bool,
    /// Pathspecs handed to `git ls-files` (all tracked files when empty)
    pub patterns: Vec<String>,
    /// Case-insensitive suffixes of generated files that are never blamed
    pub generated_suffixes: Vec<String>,
    /// Bulk import commits whose lines are not counted
    pub import_commits: Vec<String>,
}

impl Default for BlameSettings {
    fn default() -> Self {
        Self {
            revision: "HEAD".to_string(),
            ignore_whitespace: true,
            patterns: Vec::new(),
            generated_suffixes: vec![DEFAULT_GENERATED_SUFFIX.to_string()],
            import_commits: Vec::new(),
        }
    }
}

/// `[pipeline]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
}

impl ProjectConfig {
    /// Import filter built from `blame.import_commits` plus `extra` ids.
    pub fn import_filter(&self, extra: &[String]) -> ImportFilter {
        ImportFilter::new(self.blame.import_commits.iter().chain(extra))
    }

    /// Pipeline configuration with file values applied over the defaults.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config =
            PipelineConfig::new().with_generated_suffixes(&self.blame.generated_suffixes);
        if let Some(workers) = self.pipeline.workers {
            config = config.with_workers(workers);
        }
        if let Some(batch_size) = self.pipeline.batch_size {
            config = config.with_batch_size(batch_size);
        }
        config
    }

    pub fn author_aliases(&self) -> AuthorAliases {
        AuthorAliases::new(&self.authors)
    }
}

/// Load `superblame.toml` from the repository root, falling back to defaults.
///
/// A broken file is reported and ignored rather than aborting the run.
pub fn load_project_config(repo_path: &Path) -> ProjectConfig {
    let toml_path = repo_path.join(CONFIG_FILE_NAME);
    if !toml_path.exists() {
        debug!("No project config found, using defaults");
        return ProjectConfig::default();
    }

    match load_config_file(&toml_path) {
        Ok(config) => {
            debug!("Loaded project config from {}", toml_path.display());
            config
        }
        Err(e) => {
            warn!("Failed to load {}: {:#}", toml_path.display(), e);
            ProjectConfig::default()
        }
    }
}

/// Load an explicitly requested config file. Errors are fatal.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ProjectConfig =
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))?;
    Ok(config)
}
