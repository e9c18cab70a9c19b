//! Core data models for line ownership statistics
//!
//! A [`LineCount`] is both the per-file result of parsing one blame stream and
//! the running total the reducer accumulates. Merging is a key-wise sum, so the
//! order and grouping of merges never changes the final total.

use chrono::{DateTime, NaiveDate};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Line counts grouped by author and by calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineCount {
    /// Raw author identity -> attributed lines
    pub by_author: FxHashMap<String, u64>,
    /// UTC calendar day of the author timestamp -> attributed lines
    pub by_day: FxHashMap<NaiveDate, u64>,
}

impl LineCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no lines have been attributed.
    pub fn is_empty(&self) -> bool {
        self.by_author.is_empty() && self.by_day.is_empty()
    }

    /// Attribute `lines` lines to `record`.
    ///
    /// A zero weight is a no-op so excluded commits never create empty keys.
    pub fn add(&mut self, record: &CommitRecord, lines: u64) {
        if lines == 0 {
            return;
        }
        *self.by_author.entry(record.author.clone()).or_insert(0) += lines;
        *self.by_day.entry(record.day()).or_insert(0) += lines;
    }

    /// Merge `other` into `self` by summing matching keys.
    pub fn merge(&mut self, other: &LineCount) {
        for (author, lines) in &other.by_author {
            *self.by_author.entry(author.clone()).or_insert(0) += lines;
        }
        for (day, lines) in &other.by_day {
            *self.by_day.entry(*day).or_insert(0) += lines;
        }
    }

    /// Merge an owned partial, reusing its author strings.
    pub fn merge_owned(&mut self, other: LineCount) {
        for (author, lines) in other.by_author {
            *self.by_author.entry(author).or_insert(0) += lines;
        }
        for (day, lines) in other.by_day {
            *self.by_day.entry(day).or_insert(0) += lines;
        }
    }

    /// Total lines in the author table.
    pub fn author_lines(&self) -> u64 {
        self.by_author.values().sum()
    }

    /// Total lines in the day table.
    pub fn day_lines(&self) -> u64 {
        self.by_day.values().sum()
    }

    /// Author table sorted by descending line count, ties broken by name.
    pub fn author_table(&self) -> Vec<AuthorRow> {
        let mut rows: Vec<AuthorRow> = self
            .by_author
            .iter()
            .map(|(author, &lines)| AuthorRow {
                author: author.clone(),
                lines,
            })
            .collect();
        rows.sort_by(|a, b| b.lines.cmp(&a.lines).then_with(|| a.author.cmp(&b.author)));
        rows
    }

    /// Day table sorted most recent first.
    pub fn day_table(&self) -> Vec<DayRow> {
        let mut rows: Vec<DayRow> = self
            .by_day
            .iter()
            .map(|(&day, &lines)| DayRow { day, lines })
            .collect();
        rows.sort_by(|a, b| b.day.cmp(&a.day));
        rows
    }
}

impl FromIterator<LineCount> for LineCount {
    fn from_iter<I: IntoIterator<Item = LineCount>>(iter: I) -> Self {
        let mut total = LineCount::new();
        for partial in iter {
            total.merge_owned(partial);
        }
        total
    }
}

/// Author and timestamp of one commit, as announced in a blame stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Full 40-character commit hash
    pub commit_id: String,
    /// Value of the `author` field
    pub author: String,
    /// Value of the `author-time` field (seconds since epoch)
    pub author_time: i64,
}

impl CommitRecord {
    /// Calendar day of the author timestamp, truncated in UTC.
    ///
    /// Timestamps outside chrono's range fall back to the epoch day.
    pub fn day(&self) -> NaiveDate {
        day_of(self.author_time)
    }
}

/// UTC calendar day containing `epoch_secs`.
pub fn day_of(epoch_secs: i64) -> NaiveDate {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// One row of the author table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorRow {
    pub author: String,
    pub lines: u64,
}

/// One row of the day table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayRow {
    pub day: NaiveDate,
    pub lines: u64,
}
