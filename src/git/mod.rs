//! Git blame attribution
//!
//! Turns one file's `git blame --porcelain` output into a [`LineCount`].
//!
//! # Example
//!
//! ```no_run
//! use superblame::git::{blame_file, GitCli, ImportFilter};
//! use std::path::Path;
//!
//! let git = GitCli::open(Path::new("/path/to/repo")).unwrap();
//! let counts = blame_file(&git, "src/main.rs", &ImportFilter::empty()).unwrap();
//! println!("{} lines", counts.author_lines());
//! ```

pub mod command;
mod commit_cache;
pub mod error;
pub mod import_filter;
pub mod porcelain;

pub use command::{BlameSource, BlameStream, GitCli};
pub use error::BlameError;
pub use import_filter::ImportFilter;
pub use porcelain::{parse_stream, PorcelainParser};

use crate::models::LineCount;

/// Blame one file and aggregate its lines.
///
/// The stream is fully parsed before the exit status is checked; a parse error
/// kills the producer instead of draining it. No partial count escapes on error.
pub fn blame_file<S>(source: &S, path: &str, filter: &ImportFilter) -> Result<LineCount, BlameError>
where
    S: BlameSource + ?Sized,
{
    let mut stream = source.blame_stream(path)?;
    match parse_stream(stream.reader(), filter) {
        Ok(counts) => {
            stream.finish()?;
            Ok(counts)
        }
        Err(e) => {
            stream.abort();
            Err(e)
        }
    }
}
