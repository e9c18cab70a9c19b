//! Output reporters for ownership tables
//!
//! Supports:
//! - `text` - Aligned terminal tables
//! - `json` - Machine-readable JSON

mod json;
mod text;

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;

use crate::authors::AuthorAliases;
use crate::models::{AuthorRow, DayRow, LineCount};
use crate::pipeline::PipelineStats;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// The two ownership tables plus run statistics.
#[derive(Debug, Clone, Serialize)]
pub struct OwnershipReport {
    /// Attributed lines across all files
    pub total_lines: u64,
    /// Authors by descending line count
    pub authors: Vec<AuthorRow>,
    /// Days, most recent first (UTC)
    pub days: Vec<DayRow>,
    pub stats: PipelineStats,
}

impl OwnershipReport {
    /// Build the tables from the final total.
    ///
    /// Aliases are applied first; `top` then truncates the author table only.
    pub fn new(
        total: &LineCount,
        stats: PipelineStats,
        aliases: &AuthorAliases,
        top: Option<usize>,
        include_days: bool,
    ) -> Self {
        let total = if aliases.is_empty() {
            total.clone()
        } else {
            aliases.canonicalize(total)
        };

        let mut authors = total.author_table();
        if let Some(n) = top {
            authors.truncate(n);
        }
        let days = if include_days {
            total.day_table()
        } else {
            Vec::new()
        };

        Self {
            total_lines: total.author_lines(),
            authors,
            days,
            stats,
        }
    }
}

/// Render a report in the given format
pub fn report(report: &OwnershipReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(report),
        OutputFormat::Json => json::render(report),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::CommitRecord;

    pub(crate) fn test_report() -> OwnershipReport {
        let mut total = LineCount::new();
        for (author, time, lines) in [("Alice", 0, 10), ("Bob", 86_400, 4), ("dsun", 86_400, 6)] {
            let record = CommitRecord {
                commit_id: "0".repeat(40),
                author: author.to_string(),
                author_time: time,
            };
            total.add(&record, lines);
        }
        let stats = PipelineStats {
            files_total: 3,
            files_dispatched: 3,
            files_blamed: 3,
            ..Default::default()
        };
        let aliases = AuthorAliases::new([("DSUN", "David Sun")]);
        OwnershipReport::new(&total, stats, &aliases, None, true)
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_report_applies_aliases() {
        let report = test_report();
        assert_eq!(report.total_lines, 20);
        assert_eq!(report.authors[0].author, "Alice");
        assert_eq!(report.authors[1].author, "David Sun");
        assert_eq!(report.days[0].lines, 10);
        assert_eq!(report.days[1].lines, 10);
    }

    #[test]
    fn test_top_truncates_authors_only() {
        let mut total = LineCount::new();
        for (i, author) in ["a", "b", "c"].iter().enumerate() {
            let record = CommitRecord {
                commit_id: "0".repeat(40),
                author: author.to_string(),
                author_time: 86_400 * i as i64,
            };
            total.add(&record, 1);
        }
        let report = OwnershipReport::new(
            &total,
            PipelineStats::default(),
            &AuthorAliases::default(),
            Some(1),
            false,
        );
        assert_eq!(report.authors.len(), 1);
        assert!(report.days.is_empty());
        assert_eq!(report.total_lines, 3);
    }
}
