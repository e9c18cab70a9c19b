//! Text (terminal) reporter

use super::OwnershipReport;
use anyhow::Result;
use console::style;
use std::fmt::Write;

/// Render report as aligned terminal tables
pub fn render(report: &OwnershipReport) -> Result<String> {
    let mut out = String::new();

    let width = report
        .authors
        .iter()
        .map(|row| row.author.chars().count())
        .max()
        .unwrap_or(0)
        .max("Author".len());

    writeln!(out, "{}", style("Lines by author").bold())?;
    writeln!(out, "{:<width$}  {:>10}  {:>6}", "Author", "Lines", "Share")?;
    for row in &report.authors {
        writeln!(
            out,
            "{:<width$}  {:>10}  {:>5.1}%",
            row.author,
            row.lines,
            percent(row.lines, report.total_lines)
        )?;
    }
    writeln!(out, "{:<width$}  {:>10}", "Total", report.total_lines)?;

    if !report.days.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", style("Lines by day (UTC)").bold())?;
        for row in &report.days {
            writeln!(out, "{}  {:>10}", row.day, row.lines)?;
        }
    }

    let stats = &report.stats;
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        style(format!(
            "{} files blamed, {} skipped, {} failed",
            stats.files_blamed, stats.files_skipped, stats.files_failed
        ))
        .dim()
    )?;
    for failed in &stats.failures {
        writeln!(out, "  {} {} ({})", style("bad:").red(), failed.path, failed.message)?;
    }

    Ok(out)
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_text_render_lists_tables() {
        console::set_colors_enabled(false);
        let out = render(&test_report()).unwrap();
        assert!(out.contains("Lines by author"));
        assert!(out.contains("Alice"));
        assert!(out.contains("50.0%"));
        assert!(out.contains("1970-01-02"));
        assert!(out.contains("3 files blamed"));
    }

    #[test]
    fn test_percent_of_nothing() {
        assert_eq!(percent(0, 0), 0.0);
    }
}
