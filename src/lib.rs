//! superblame - line ownership statistics from git blame
//!
//! Runs `git blame --porcelain` over every tracked file with a bounded pool of
//! workers and reduces the results into two tables: lines per author and lines
//! per day.

pub mod authors;
pub mod cli;
pub mod config;
pub mod git;
pub mod models;
pub mod pipeline;
pub mod reporters;

pub use models::{CommitRecord, LineCount};
pub use pipeline::{analyze_repository, run_pipeline, PipelineConfig, PipelineOutput, PipelineStats};
