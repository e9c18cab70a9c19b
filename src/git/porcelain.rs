//! Incremental parser for `git blame --porcelain` output
//!
//! The stream is a sequence of groups, one per run of lines blamed on the same
//! commit:
//!
//! ```text
//! <sha> <orig-line> <final-line> <lines-in-group>
//! author Alice                         \
//! author-time 1000                      | only on the first sight of <sha>
//! ...                                   | in this stream
//! filename src/lib.rs                  /
//! \t<content of first line>
//! <sha> <orig-line> <final-line>
//! \t<content of next line>
//! ```
//!
//! When a commit shows up again later in the same stream its metadata block is
//! omitted, so the parser keeps a [`CommitCache`] for the duration of the file.
//! Each group adds its whole line count once, to the author and to the UTC day
//! of the author timestamp, unless the commit is in the [`ImportFilter`].

use std::io::BufRead;
use tracing::trace;

use super::commit_cache::CommitCache;
use super::error::BlameError;
use super::import_filter::ImportFilter;
use crate::models::{CommitRecord, LineCount};

const COMMIT_ID_LEN: usize = 40;

/// Where the parser is inside the current group.
#[derive(Debug)]
enum State {
    /// Between groups; the next line must be a 4-token group header
    Header,
    /// Reading the metadata block of a commit not seen before
    Metadata {
        commit_id: String,
        lines: u32,
        author: Option<String>,
        author_time: Option<i64>,
    },
    /// First content line of a group whose commit is already cached.
    /// git may repeat `previous`/`filename` here for multi-path commits.
    CachedContent { commit_id: String, left: u32 },
    /// Expecting the 3-token restatement that opens the next entry
    Restatement { commit_id: String, left: u32 },
    /// Expecting the content line that closes the current entry
    Content { commit_id: String, left: u32 },
}

/// Line-at-a-time porcelain parser for one file.
pub struct PorcelainParser<'f> {
    filter: &'f ImportFilter,
    cache: CommitCache,
    counts: LineCount,
    state: State,
    line_no: usize,
}

impl<'f> PorcelainParser<'f> {
    pub fn new(filter: &'f ImportFilter) -> Self {
        Self {
            filter,
            cache: CommitCache::new(),
            counts: LineCount::new(),
            state: State::Header,
            line_no: 0,
        }
    }

    /// Feed one physical line, with or without its trailing newline.
    pub fn feed(&mut self, raw: &[u8]) -> Result<(), BlameError> {
        self.line_no += 1;
        let line = raw.strip_suffix(b"\n").unwrap_or(raw);

        let state = std::mem::replace(&mut self.state, State::Header);
        self.state = match state {
            State::Header => self.on_header(line)?,
            State::Metadata {
                commit_id,
                lines,
                mut author,
                mut author_time,
            } => {
                if is_content(line) {
                    let line_no = self.line_no;
                    let record = self
                        .cache
                        .get_or_insert_with(&commit_id, || {
                            close_metadata(line_no, commit_id.clone(), author, author_time)
                        })?
                        .clone();
                    self.attribute(&record, lines);
                    after_content(commit_id, lines - 1)
                } else {
                    let field = trim_eol(line);
                    if let Some(value) = field.strip_prefix(b"author ") {
                        author = Some(String::from_utf8_lossy(value).into_owned());
                    } else if let Some(value) = field.strip_prefix(b"author-time ") {
                        author_time = Some(self.parse_author_time(value)?);
                    }
                    State::Metadata {
                        commit_id,
                        lines,
                        author,
                        author_time,
                    }
                }
            }
            State::CachedContent { commit_id, left } => {
                if is_content(line) {
                    after_content(commit_id, left)
                } else if line.starts_with(b"filename ") || line.starts_with(b"previous ") {
                    State::CachedContent { commit_id, left }
                } else {
                    return Err(BlameError::format(
                        self.line_no,
                        format!("expected content line for cached commit {commit_id}"),
                    ));
                }
            }
            State::Restatement { commit_id, left } => {
                self.check_restatement(line, &commit_id)?;
                State::Content {
                    commit_id,
                    left: left - 1,
                }
            }
            State::Content { commit_id, left } => {
                if !is_content(line) {
                    return Err(BlameError::format(
                        self.line_no,
                        format!("expected content line for commit {commit_id}"),
                    ));
                }
                after_content(commit_id, left)
            }
        };
        Ok(())
    }

    /// Close the stream. Only valid on a group boundary.
    pub fn finish(self) -> Result<LineCount, BlameError> {
        match self.state {
            State::Header => Ok(self.counts),
            State::Metadata { commit_id, .. }
            | State::CachedContent { commit_id, .. }
            | State::Restatement { commit_id, .. }
            | State::Content { commit_id, .. } => Err(BlameError::Protocol {
                line: self.line_no,
                commit_id,
            }),
        }
    }

    /// Number of distinct commits announced so far.
    pub fn commits_seen(&self) -> usize {
        self.cache.len()
    }

    fn on_header(&mut self, line: &[u8]) -> Result<State, BlameError> {
        let text = std::str::from_utf8(trim_eol(line))
            .map_err(|_| BlameError::format(self.line_no, "group header is not UTF-8"))?;
        let tokens: Vec<&str> = text.split_ascii_whitespace().collect();
        if tokens.len() != 4 {
            return Err(BlameError::format(
                self.line_no,
                format!("group header has {} tokens, expected 4", tokens.len()),
            ));
        }

        let commit_id = tokens[0];
        if !is_commit_id(commit_id) {
            return Err(BlameError::format(
                self.line_no,
                format!("invalid commit id {commit_id:?}"),
            ));
        }
        self.parse_line_number(tokens[1])?;
        self.parse_line_number(tokens[2])?;
        let lines = self.parse_line_number(tokens[3])?;

        if let Some(record) = self.cache.get(commit_id) {
            let record = record.clone();
            self.attribute(&record, lines);
            return Ok(State::CachedContent {
                commit_id: record.commit_id,
                left: lines - 1,
            });
        }

        Ok(State::Metadata {
            commit_id: commit_id.to_string(),
            lines,
            author: None,
            author_time: None,
        })
    }

    fn check_restatement(&self, line: &[u8], commit_id: &str) -> Result<(), BlameError> {
        let text = std::str::from_utf8(trim_eol(line)).unwrap_or_default();
        let tokens: Vec<&str> = text.split_ascii_whitespace().collect();
        if tokens.len() != 3 || tokens[0] != commit_id {
            return Err(BlameError::format(
                self.line_no,
                format!("expected `{commit_id} <orig> <final>` restatement"),
            ));
        }
        self.parse_line_number(tokens[1])?;
        self.parse_line_number(tokens[2])?;
        Ok(())
    }

    fn parse_line_number(&self, token: &str) -> Result<u32, BlameError> {
        match token.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(BlameError::format(
                self.line_no,
                format!("expected a positive line number, got {token:?}"),
            )),
        }
    }

    fn parse_author_time(&self, value: &[u8]) -> Result<i64, BlameError> {
        std::str::from_utf8(value)
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| BlameError::format(self.line_no, "author-time is not an integer"))
    }

    fn attribute(&mut self, record: &CommitRecord, lines: u32) {
        if self.filter.contains(&record.commit_id) {
            return;
        }
        self.counts.add(record, u64::from(lines));
    }
}

/// Parse a whole porcelain stream.
///
/// Reads raw bytes so source lines in any encoding pass through untouched.
pub fn parse_stream<R: BufRead>(mut reader: R, filter: &ImportFilter) -> Result<LineCount, BlameError> {
    let mut parser = PorcelainParser::new(filter);
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        parser.feed(&buf)?;
    }
    trace!("Blame stream referenced {} commits", parser.commits_seen());
    parser.finish()
}

/// Build the record once the metadata block is over.
fn close_metadata(
    line_no: usize,
    commit_id: String,
    author: Option<String>,
    author_time: Option<i64>,
) -> Result<CommitRecord, BlameError> {
    let author = author.ok_or_else(|| {
        BlameError::format(line_no, format!("commit {commit_id} has no author field"))
    })?;
    let author_time = author_time.ok_or_else(|| {
        BlameError::format(line_no, format!("commit {commit_id} has no author-time field"))
    })?;
    Ok(CommitRecord {
        commit_id,
        author,
        author_time,
    })
}

fn after_content(commit_id: String, left: u32) -> State {
    if left == 0 {
        State::Header
    } else {
        State::Restatement { commit_id, left }
    }
}

fn is_content(line: &[u8]) -> bool {
    line.first() == Some(&b'\t')
}

fn is_commit_id(token: &str) -> bool {
    token.len() == COMMIT_ID_LEN && token.bytes().all(|b| b.is_ascii_hexdigit())
}

fn trim_eol(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::day_of;

    fn sha(c: char) -> String {
        c.to_string().repeat(40)
    }

    /// Emit one group the way `git blame -p` does.
    fn group(id: &str, start: u32, count: u32, meta: Option<(&str, i64)>) -> String {
        let mut out = format!("{id} {start} {start} {count}\n");
        if let Some((author, time)) = meta {
            out.push_str(&format!(
                "author {author}\nauthor-mail <{author}@example.com>\nauthor-time {time}\n\
                 author-tz +0000\ncommitter {author}\ncommitter-mail <{author}@example.com>\n\
                 committer-time {time}\ncommitter-tz +0000\nsummary work\nfilename src/lib.rs\n"
            ));
        }
        out.push_str(&format!("\tline {start}\n"));
        for i in 1..count {
            out.push_str(&format!("{id} {} {}\n\tline {}\n", start + i, start + i, start + i));
        }
        out
    }

    fn parse(text: &str, filter: &ImportFilter) -> Result<LineCount, BlameError> {
        parse_stream(text.as_bytes(), filter)
    }

    #[test]
    fn test_empty_stream_is_empty_count() {
        let counts = parse("", &ImportFilter::empty()).unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn test_group_weights_sum() {
        let stream = [
            group(&sha('a'), 1, 3, Some(("Alice", 1000))),
            group(&sha('b'), 4, 2, Some(("Bob", 200_000))),
            group(&sha('c'), 6, 5, Some(("Alice", 300_000))),
        ]
        .concat();

        let counts = parse(&stream, &ImportFilter::empty()).unwrap();
        assert_eq!(counts.author_lines(), 10);
        assert_eq!(counts.day_lines(), 10);
        assert_eq!(counts.by_author["Alice"], 8);
        assert_eq!(counts.by_author["Bob"], 2);
        assert_eq!(counts.by_day[&day_of(1000)], 3);
    }

    #[test]
    fn test_cached_commit_reuses_metadata() {
        // Same commit in two non-adjacent groups; the second has no metadata.
        let stream = [
            group(&sha('a'), 1, 2, Some(("Alice", 1000))),
            group(&sha('b'), 3, 1, Some(("Bob", 500_000))),
            group(&sha('a'), 4, 3, None),
        ]
        .concat();

        let filter = ImportFilter::empty();
        let mut parser = PorcelainParser::new(&filter);
        for line in stream.split_inclusive('\n') {
            parser.feed(line.as_bytes()).unwrap();
        }
        assert_eq!(parser.commits_seen(), 2);

        let counts = parser.finish().unwrap();
        assert_eq!(counts.by_author["Alice"], 5);
        assert_eq!(counts.by_author["Bob"], 1);
        assert_eq!(counts.by_day[&day_of(1000)], 5);
    }

    #[test]
    fn test_cached_commit_with_repeated_filename() {
        let id = sha('a');
        let stream = format!(
            "{}{id} 9 9 1\nprevious {} old/path.rs\nfilename src/lib.rs\n\tmoved line\n",
            group(&id, 1, 1, Some(("Alice", 1000))),
            sha('f'),
        );
        let counts = parse(&stream, &ImportFilter::empty()).unwrap();
        assert_eq!(counts.by_author["Alice"], 2);
    }

    #[test]
    fn test_import_commit_weighs_zero_but_stays_cached() {
        let import = sha('d');
        let filter = ImportFilter::new([import.as_str()]);
        let stream = [
            group(&import, 1, 50, Some(("Importer", 1000))),
            group(&sha('a'), 51, 2, Some(("Alice", 2000))),
            group(&import, 53, 10, None),
        ]
        .concat();

        let counts = parse(&stream, &filter).unwrap();
        assert_eq!(counts.author_lines(), 2);
        assert_eq!(counts.day_lines(), 2);
        assert!(!counts.by_author.contains_key("Importer"));
    }

    #[test]
    fn test_metadata_in_any_order() {
        let id = sha('e');
        let stream = format!("{id} 1 1 1\nsummary s\nauthor-time 86400\nboundary\nauthor Eve\n\tx\n");
        let counts = parse(&stream, &ImportFilter::empty()).unwrap();
        assert_eq!(counts.by_author["Eve"], 1);
        assert_eq!(counts.by_day[&day_of(86_400)], 1);
    }

    #[test]
    fn test_author_mail_is_not_author() {
        let id = sha('e');
        let stream = format!("{id} 1 1 1\nauthor-mail <eve@example.com>\nauthor-time 1\n\tx\n");
        let err = parse(&stream, &ImportFilter::empty()).unwrap_err();
        assert!(matches!(err, BlameError::Format { .. }), "{err}");
    }

    #[test]
    fn test_header_with_three_tokens_is_format_error() {
        let stream = format!("{} 1 1\nauthor A\nauthor-time 1\n\tx\n", sha('a'));
        let err = parse(&stream, &ImportFilter::empty()).unwrap_err();
        assert!(matches!(err, BlameError::Format { line: 1, .. }), "{err}");
    }

    #[test]
    fn test_short_commit_id_is_format_error() {
        let stream = "abc123 1 1 1\nauthor A\nauthor-time 1\n\tx\n";
        let err = parse(stream, &ImportFilter::empty()).unwrap_err();
        assert!(matches!(err, BlameError::Format { .. }));
    }

    #[test]
    fn test_missing_author_time_is_format_error() {
        let stream = format!("{} 1 1 1\nauthor A\n\tx\n", sha('a'));
        let err = parse(&stream, &ImportFilter::empty()).unwrap_err();
        assert!(err.to_string().contains("author-time"));
    }

    #[test]
    fn test_zero_group_count_rejected() {
        let stream = format!("{} 1 1 0\n", sha('a'));
        assert!(parse(&stream, &ImportFilter::empty()).is_err());
    }

    #[test]
    fn test_truncated_group_is_protocol_error() {
        let full = group(&sha('a'), 1, 3, Some(("Alice", 1000)));
        // Drop the final content line
        let truncated = full.trim_end_matches("\tline 3\n");
        let err = parse(truncated, &ImportFilter::empty()).unwrap_err();
        assert!(matches!(err, BlameError::Protocol { .. }), "{err}");
    }

    #[test]
    fn test_truncated_metadata_is_protocol_error() {
        let stream = format!("{} 1 1 1\nauthor A\n", sha('a'));
        let err = parse(&stream, &ImportFilter::empty()).unwrap_err();
        assert_eq!(err.kind(), "protocol");
    }

    #[test]
    fn test_wrong_restatement_commit_rejected() {
        let stream = format!(
            "{a} 1 1 2\nauthor A\nauthor-time 1\n\tx\n{b} 2 2\n\ty\n",
            a = sha('a'),
            b = sha('b')
        );
        let err = parse(&stream, &ImportFilter::empty()).unwrap_err();
        assert!(matches!(err, BlameError::Format { line: 5, .. }), "{err}");
    }

    #[test]
    fn test_non_utf8_content_and_crlf() {
        let mut bytes = format!("{} 1 1 2\r\nauthor J\u{f6}rg\r\nauthor-time 10\r\n", sha('a')).into_bytes();
        bytes.extend_from_slice(b"\t\xff\xfe binary\r\n");
        bytes.extend_from_slice(format!("{} 2 2\r\n\t\r\n", sha('a')).as_bytes());

        let counts = parse_stream(&bytes[..], &ImportFilter::empty()).unwrap();
        assert_eq!(counts.by_author["J\u{f6}rg"], 2);
    }
}
