//! Bounded fan-out/reduce pipeline over blame streams
//!
//! ```text
//!                     ┌─────────────┐
//!                     │   Producer  │  Feeds paths in input order
//!                     └──────┬──────┘
//!                            │ bounded channel (capacity = workers)
//!            ┌───────────────┼───────────────┐
//!            ▼               ▼               ▼
//!     ┌──────────┐    ┌──────────┐    ┌──────────┐
//!     │ Worker 1 │    │ Worker 2 │    │ Worker K │  One file at a time each,
//!     └────┬─────┘    └────┬─────┘    └────┬─────┘  own commit cache
//!          └───────────────┼───────────────┘
//!                          │ bounded channel (one outcome per path)
//!                          ▼
//!                   ┌──────────────┐
//!                   │   Reducer    │  Batches outcomes, sole owner of the total
//!                   └──────────────┘
//! ```
//!
//! # Memory Model
//!
//! - When all workers are busy the producer blocks on the path channel, so at
//!   most `workers` blame streams are open at once.
//! - When the reducer falls behind, workers block on the outcome channel.
//! - The running total lives on the reducer thread only. Workers never touch
//!   it, so it needs no lock; merge order is irrelevant because merging is a
//!   key-wise sum.

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

use crate::git::{blame_file, BlameError, BlameSource, ImportFilter};
use crate::models::LineCount;

/// Suffix of designer-generated sources skipped by default.
pub const DEFAULT_GENERATED_SUFFIX: &str = ".designer.cs";

/// Upper bound on concurrent blame workers.
pub const MAX_WORKERS: usize = 64;

/// Configuration for the blame pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of concurrent blame workers, always in `1..=MAX_WORKERS`
    num_workers: usize,
    /// Per-file results folded together before touching the total, at least 1
    batch_size: usize,
    /// Lower-cased path suffixes that are never blamed
    generated_suffixes: Vec<String>,
}

impl PipelineConfig {
    /// Two workers per hardware thread; blame is mostly waiting on git.
    pub fn new() -> Self {
        let num_workers = std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(8);

        Self {
            num_workers: num_workers.clamp(1, MAX_WORKERS),
            batch_size: 100,
            generated_suffixes: vec![DEFAULT_GENERATED_SUFFIX.to_string()],
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Replace the generated-file suffixes (matched case-insensitively).
    pub fn with_generated_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.generated_suffixes = suffixes
            .into_iter()
            .map(|s| s.as_ref().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    /// Whether `path` is generated code that should not be blamed.
    pub fn is_generated(&self, path: &str) -> bool {
        if self.generated_suffixes.is_empty() {
            return false;
        }
        let lower = path.to_lowercase();
        self.generated_suffixes.iter().any(|s| lower.ends_with(s.as_str()))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A file whose blame could not be used.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub kind: &'static str,
    pub message: String,
}

/// Stats from one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Entries in the input list, empty ones included
    pub files_total: usize,
    /// Files handed to a worker
    pub files_dispatched: usize,
    /// Files whose blame was parsed and merged
    pub files_blamed: usize,
    /// Generated files and empty entries skipped before dispatch
    pub files_skipped: usize,
    /// Files that contributed nothing because of an error
    pub files_failed: usize,
    /// Batches merged into the total
    pub batches: usize,
    pub failures: Vec<FailedFile>,
}

impl PipelineStats {
    fn record_failure(&mut self, path: String, error: &BlameError) {
        self.files_failed += 1;
        self.failures.push(FailedFile {
            path,
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}

/// Final total plus run statistics.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub total: LineCount,
    pub stats: PipelineStats,
}

struct FileOutcome {
    path: String,
    result: Result<LineCount, BlameError>,
}

/// Run the bounded blame pipeline over `files`.
///
/// Every dispatched path yields exactly one outcome, and the calling thread
/// merges each outcome once. A failed file is logged and skipped; it never
/// stops the other workers.
///
/// # Arguments
///
/// * `files` - Repository-relative paths, dispatched in this order
/// * `source` - Where blame streams come from
/// * `filter` - Commits whose lines weigh zero
/// * `config` - Pipeline configuration
/// * `progress` - Optional `(done, total)` callback, called on the reducer thread
pub fn run_pipeline<S>(
    files: Vec<String>,
    source: Arc<S>,
    filter: Arc<ImportFilter>,
    config: &PipelineConfig,
    progress: Option<&(dyn Fn(usize, usize) + Sync)>,
) -> PipelineOutput
where
    S: BlameSource + ?Sized + 'static,
{
    let mut stats = PipelineStats {
        files_total: files.len(),
        ..Default::default()
    };

    let dispatch: Vec<String> = files
        .into_iter()
        .filter(|path| {
            let skip = path.is_empty() || config.is_generated(path);
            if skip && !path.is_empty() {
                debug!("Skipping generated file {}", path);
            }
            !skip
        })
        .collect();
    stats.files_skipped = stats.files_total - dispatch.len();
    stats.files_dispatched = dispatch.len();
    let total_files = dispatch.len();

    // Never fewer than one worker, or dispatched paths go undelivered
    let num_workers = config.num_workers.clamp(1, MAX_WORKERS);
    let batch_size = config.batch_size.max(1);

    info!(
        "Blame pipeline: {} files, workers={}, batch={}",
        total_files, num_workers, batch_size
    );

    let (file_tx, file_rx) = bounded::<String>(num_workers);
    let (result_tx, result_rx) = bounded::<FileOutcome>(num_workers);

    // Producer thread: feed paths, blocking while every worker is busy
    let producer = thread::spawn(move || {
        let mut sent = 0;
        for path in dispatch {
            if file_tx.send(path).is_err() {
                break;
            }
            sent += 1;
        }
        sent
    });

    let mut workers = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let rx = file_rx.clone();
        let tx = result_tx.clone();
        let source = Arc::clone(&source);
        let filter = Arc::clone(&filter);

        let handle = thread::spawn(move || {
            for path in rx {
                let result = blame_file(source.as_ref(), &path, &filter);
                if tx.send(FileOutcome { path, result }).is_err() {
                    break; // Reducer closed
                }
            }
        });
        workers.push(handle);
    }

    // Drop our copies of channels so receivers can detect completion
    drop(file_rx);
    drop(result_tx);

    // Reducer: the only writer of `total`
    let mut total = LineCount::new();
    let mut batch: Vec<LineCount> = Vec::with_capacity(batch_size);
    let mut done = 0;

    for outcome in result_rx {
        done += 1;
        if let Some(cb) = progress {
            cb(done, total_files);
        }

        match outcome.result {
            Ok(counts) => {
                stats.files_blamed += 1;
                if !counts.is_empty() {
                    batch.push(counts);
                }
            }
            Err(e) => {
                warn!("Blame failed for {}: {}", outcome.path, e);
                stats.record_failure(outcome.path, &e);
            }
        }

        if batch.len() >= batch_size {
            reduce_batch(&mut total, &mut batch);
            stats.batches += 1;
        }
    }

    if !batch.is_empty() {
        reduce_batch(&mut total, &mut batch);
        stats.batches += 1;
    }

    match producer.join() {
        Ok(sent) if sent < total_files => {
            warn!("Workers stopped early: only {} of {} files were dispatched", sent, total_files);
        }
        Ok(_) => {}
        Err(_) => warn!("The blame producer panicked"),
    }
    for w in workers {
        if w.join().is_err() {
            warn!("A blame worker panicked; its current file was not counted");
        }
    }

    info!(
        "Blamed {} files ({} failed, {} skipped): {} lines, {} authors",
        stats.files_blamed,
        stats.files_failed,
        stats.files_skipped,
        total.author_lines(),
        total.by_author.len()
    );

    PipelineOutput { total, stats }
}

/// List tracked files and run the pipeline over them.
///
/// Failing to list files is the one error that aborts the whole run.
pub fn analyze_repository<S>(
    source: Arc<S>,
    patterns: &[String],
    filter: Arc<ImportFilter>,
    config: &PipelineConfig,
    progress: Option<&(dyn Fn(usize, usize) + Sync)>,
) -> Result<PipelineOutput>
where
    S: BlameSource + ?Sized + 'static,
{
    let files = source
        .tracked_files(patterns)
        .context("Cannot enumerate tracked files")?;
    Ok(run_pipeline(files, source, filter, config, progress))
}

/// Fold a batch into one partial, then merge it into the total.
fn reduce_batch(total: &mut LineCount, batch: &mut Vec<LineCount>) {
    let partial: LineCount = batch.drain(..).collect();
    total.merge_owned(partial);
}
