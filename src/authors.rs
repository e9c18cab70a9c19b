//! Mapping of raw author identities to display names
//!
//! The same person often commits under several identities ("Sun, David",
//! "dsun"). Aliases fold those together after reduction, so the pipeline
//! itself only ever deals in raw identities.

use rustc_hash::FxHashMap;

use crate::models::LineCount;

/// Case-insensitive raw identity -> display name map.
#[derive(Debug, Clone, Default)]
pub struct AuthorAliases {
    names: FxHashMap<String, String>,
}

impl AuthorAliases {
    pub fn new<I, K, V>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            names: aliases
                .into_iter()
                .map(|(raw, name)| (raw.as_ref().to_lowercase(), name.as_ref().to_string()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name for `raw`, or `raw` itself when it has no alias.
    pub fn canonical<'a>(&'a self, raw: &'a str) -> &'a str {
        self.names
            .get(&raw.to_lowercase())
            .map(String::as_str)
            .unwrap_or(raw)
    }

    /// Rewrite the author table, summing identities that share a display name.
    /// The day table is copied as is.
    pub fn canonicalize(&self, counts: &LineCount) -> LineCount {
        let mut out = LineCount {
            by_author: FxHashMap::default(),
            by_day: counts.by_day.clone(),
        };
        for (raw, lines) in &counts.by_author {
            *out.by_author
                .entry(self.canonical(raw).to_string())
                .or_insert(0) += lines;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommitRecord;

    fn counts(entries: &[(&str, u64)]) -> LineCount {
        let mut counts = LineCount::new();
        for (author, lines) in entries {
            let record = CommitRecord {
                commit_id: "0".repeat(40),
                author: author.to_string(),
                author_time: 0,
            };
            counts.add(&record, *lines);
        }
        counts
    }

    #[test]
    fn test_unknown_author_passes_through() {
        let aliases = AuthorAliases::new([("dsun", "David Sun")]);
        assert_eq!(aliases.canonical("Alice"), "Alice");
        assert_eq!(aliases.canonical("DSUN"), "David Sun");
    }

    #[test]
    fn test_canonicalize_merges_identities() {
        let aliases = AuthorAliases::new([("dsun", "David Sun"), ("Sun, David", "David Sun")]);
        let raw = counts(&[("dsun", 3), ("Sun, David", 4), ("Alice", 1)]);

        let merged = aliases.canonicalize(&raw);
        assert_eq!(merged.by_author.len(), 2);
        assert_eq!(merged.by_author["David Sun"], 7);
        assert_eq!(merged.by_author["Alice"], 1);
        assert_eq!(merged.author_lines(), raw.author_lines());
        assert_eq!(merged.by_day, raw.by_day);
    }
}
