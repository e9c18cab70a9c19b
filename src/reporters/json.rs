//! JSON reporter
//!
//! Outputs the report as pretty-printed JSON for piping to jq or storage.

use super::OwnershipReport;
use anyhow::Result;

/// Render report as JSON
pub fn render(report: &OwnershipReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
