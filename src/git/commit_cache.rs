//! Per-stream commit metadata cache
//!
//! Porcelain output spells out a commit's metadata only the first time the
//! commit appears in one file's stream. The cache remembers those records for
//! the rest of that stream. A fresh cache is created for every file.

use crate::models::CommitRecord;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct CommitCache {
    records: FxHashMap<String, CommitRecord>,
}

impl CommitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an already announced commit.
    pub fn get(&self, commit_id: &str) -> Option<&CommitRecord> {
        self.records.get(commit_id)
    }

    /// Return the cached record, or build it with `supplier` and cache it.
    ///
    /// The supplier only runs on the first sight of `commit_id`. Its error is
    /// returned unchanged and nothing is cached.
    pub fn get_or_insert_with<E, F>(&mut self, commit_id: &str, supplier: F) -> Result<&CommitRecord, E>
    where
        F: FnOnce() -> Result<CommitRecord, E>,
    {
        if !self.records.contains_key(commit_id) {
            let record = supplier()?;
            self.records.insert(commit_id.to_string(), record);
        }
        Ok(&self.records[commit_id])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
