//! Errors raised while blaming a single file

use thiserror::Error;

/// Everything that can go wrong with one file's blame stream.
///
/// All variants are scoped to a single file: the pipeline logs them and counts
/// the file as contributing nothing.
#[derive(Debug, Error)]
pub enum BlameError {
    /// A line does not fit the porcelain grammar
    #[error("malformed porcelain at line {line}: {reason}")]
    Format { line: usize, reason: String },

    /// The stream ended in the middle of a group
    #[error("stream ended inside the group for commit {commit_id} after line {line}")]
    Protocol { line: usize, commit_id: String },

    /// git exited with a failure status
    #[error("git blame failed ({status}): {stderr}")]
    Subprocess { status: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlameError {
    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        BlameError::Format {
            line,
            reason: reason.into(),
        }
    }

    /// Short label used in run statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            BlameError::Format { .. } => "format",
            BlameError::Protocol { .. } => "protocol",
            BlameError::Subprocess { .. } => "subprocess",
            BlameError::Io(_) => "io",
        }
    }
}
