//! Access to the git command line
//!
//! `git blame --porcelain` has no libgit2 equivalent, so blame streams come
//! from a `git` subprocess whose stdout is parsed while it is still running.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use tracing::debug;

use super::error::BlameError;

/// Bytes of git's stderr kept for an error message.
const MAX_STDERR_BYTES: usize = 4096;

/// Producer of tracked file lists and per-file blame streams.
pub trait BlameSource: Send + Sync {
    /// List tracked files matching `patterns` (all files when empty).
    fn tracked_files(&self, patterns: &[String]) -> Result<Vec<String>>;

    /// Start the porcelain blame stream for one repository-relative path.
    fn blame_stream(&self, path: &str) -> Result<BlameStream, BlameError>;
}

/// A blame stream plus the process producing it, if any.
pub struct BlameStream {
    reader: Box<dyn BufRead + Send>,
    child: Option<Child>,
    stderr: Option<JoinHandle<String>>,
}

impl BlameStream {
    /// Stream backed by an in-memory buffer (always finishes successfully).
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            reader: Box::new(Cursor::new(bytes.into())),
            child: None,
            stderr: None,
        }
    }

    fn from_child(mut child: Child) -> Result<Self, BlameError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BlameError::Io(std::io::Error::other("git stdout was not captured")))?;
        // stderr is drained concurrently so a chatty git cannot fill its pipe
        // and stall while we are still reading stdout
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf.truncate(MAX_STDERR_BYTES);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });
        Ok(Self {
            reader: Box::new(BufReader::with_capacity(64 * 1024, stdout)),
            child: Some(child),
            stderr,
        })
    }

    pub fn reader(&mut self) -> &mut (dyn BufRead + Send) {
        self.reader.as_mut()
    }

    /// Wait for the producer and turn a failure status into an error.
    ///
    /// Call after the reader has been drained.
    pub fn finish(self) -> Result<(), BlameError> {
        let Some(mut child) = self.child else {
            return Ok(());
        };
        drop(self.reader);

        let status = child.wait()?;
        let stderr = self
            .stderr
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if status.success() {
            Ok(())
        } else {
            Err(BlameError::Subprocess {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            })
        }
    }

    /// Kill the producer after the stream was abandoned mid-way.
    pub fn abort(self) {
        if let Some(mut child) = self.child {
            drop(self.reader);
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr {
            let _ = handle.join();
        }
    }
}

/// [`BlameSource`] that shells out to `git`.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
    revision: String,
    ignore_whitespace: bool,
}

impl GitCli {
    /// Use the repository at (or above) `repo_path`.
    pub fn open(repo_path: &Path) -> Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(repo_path)
            .output()
            .with_context(|| format!("Failed to run git in {}", repo_path.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} is not a git repository: {}", repo_path.display(), stderr.trim());
        }
        let top = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Opened git repository at {}", top);

        Ok(Self {
            repo_path: PathBuf::from(top),
            revision: "HEAD".to_string(),
            ignore_whitespace: true,
        })
    }

    /// Blame at `revision` instead of HEAD.
    pub fn with_revision(mut self, revision: impl Into<String>) -> Result<Self> {
        let revision = revision.into();
        // Reject values that look like flags so they cannot be read as git options
        if revision.is_empty() || revision.starts_with('-') {
            bail!(
                "Invalid revision '{}': must be a commit hash, branch name, or tag",
                revision
            );
        }
        self.revision = revision;
        Ok(self)
    }

    /// Toggle `-w` (whitespace-only changes keep their original author).
    pub fn with_ignore_whitespace(mut self, ignore: bool) -> Self {
        self.ignore_whitespace = ignore;
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_path);
        cmd
    }
}

impl BlameSource for GitCli {
    fn tracked_files(&self, patterns: &[String]) -> Result<Vec<String>> {
        let output = self
            .git()
            .args(["ls-files", "-z", "--"])
            .args(patterns)
            .output()
            .context("Failed to run git ls-files")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git ls-files failed: {}", stderr.trim());
        }

        Ok(split_file_list(&output.stdout))
    }

    fn blame_stream(&self, path: &str) -> Result<BlameStream, BlameError> {
        let mut cmd = self.git();
        cmd.args(["blame", "--porcelain"]);
        if self.ignore_whitespace {
            cmd.arg("-w");
        }
        cmd.arg(&self.revision)
            .arg("--")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        BlameStream::from_child(cmd.spawn()?)
    }
}

/// Split `ls-files` output on NUL or newline, dropping empty entries.
pub fn split_file_list(raw: &[u8]) -> Vec<String> {
    let sep = if raw.contains(&0) { 0 } else { b'\n' };
    raw.split(|&b| b == sep)
        .map(|entry| String::from_utf8_lossy(entry).trim_end_matches('\r').to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_nul_delimited() {
        let files = split_file_list(b"a.cs\0dir/b.cs\0\0c d.cs\0");
        assert_eq!(files, vec!["a.cs", "dir/b.cs", "c d.cs"]);
    }

    #[test]
    fn test_split_newline_delimited() {
        let files = split_file_list(b"a.cs\n\nb.cs\r\n");
        assert_eq!(files, vec!["a.cs", "b.cs"]);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_file_list(b"").is_empty());
    }

    #[test]
    fn test_in_memory_stream_finishes() {
        let mut stream = BlameStream::from_bytes("hello\n");
        let mut line = String::new();
        stream.reader().read_line(&mut line).unwrap();
        assert_eq!(line, "hello\n");
        assert!(stream.finish().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stderr_does_not_stall_stdout() {
        // Far more stderr than a pipe buffer holds, written before any stdout
        let child = Command::new("sh")
            .args(["-c", "head -c 200000 /dev/zero | tr '\\0' x >&2; echo done; exit 3"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let mut stream = BlameStream::from_child(child).unwrap();
        let mut out = String::new();
        stream.reader().read_to_string(&mut out).unwrap();
        assert_eq!(out, "done\n");

        match stream.finish() {
            Err(BlameError::Subprocess { stderr, .. }) => {
                assert_eq!(stderr.len(), MAX_STDERR_BYTES);
                assert!(stderr.chars().all(|c| c == 'x'));
            }
            other => panic!("expected subprocess error, got {other:?}"),
        }
    }
}
