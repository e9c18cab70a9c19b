//! Configuration module
//!
//! Loads per-repository settings from `superblame.toml`:
//!
//! ```toml
//! [blame]
//! revision = "HEAD"
//! ignore_whitespace = true
//! patterns = ["*.cs"]
//! generated_suffixes = [".designer.cs"]
//! import_commits = ["93ba65338271090e9bdb8df4481b11b091a7acab"]
//!
//! [pipeline]
//! workers = 12
//! batch_size = 100
//!
//! [authors]
//! "Sun, David" = "David Sun"
//! dsun = "David Sun"
//! ```
//!
//! Command line flags override anything set here.

pub mod project_config;

pub use project_config::{
    load_config_file, load_project_config, BlameSettings, PipelineSettings, ProjectConfig,
    CONFIG_FILE_NAME,
};
