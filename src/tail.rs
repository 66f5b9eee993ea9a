//! Incremental, offset-based reads of a log file.
//!
//! [`LogTailEngine::poll`] reads everything appended since the caller's
//! offset, classifies complete lines and hands back the offset to use next
//! time. The engine keeps no state between polls and no open file handles;
//! callers own the offset and must not poll one file concurrently with a
//! shared offset.

use crate::classify::classify_line;
use crate::entry::LogEntry;
use crate::error::{Error, Result};
use crate::level::FilterSpec;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A monitored file and how far into it content has been delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    pub path: PathBuf,
    pub last_offset: u64,
}

impl LogSource {
    /// Start from the beginning of the file, backlog included.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_offset(path, 0)
    }

    pub fn with_offset<P: AsRef<Path>>(path: P, last_offset: u64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last_offset,
        }
    }

    /// Start at the current end of the file, skipping the backlog.
    pub fn at_end<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let size = fs::metadata(path)
            .map_err(|e| Error::not_accessible(path, e))?
            .len();
        Ok(Self::with_offset(path, size))
    }

    /// Moves the cursor to where `outcome` left off.
    pub fn advance(&mut self, outcome: &PollOutcome) {
        self.last_offset = outcome.new_offset;
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Entries that passed the filter, oldest first.
    pub entries: Vec<LogEntry>,
    /// End of the last complete line consumed.
    pub new_offset: u64,
    /// The file was smaller than the supplied offset and was re-read from 0.
    pub truncated: bool,
}

/// Reads and classifies newly appended log lines.
#[derive(Debug, Clone, Default)]
pub struct LogTailEngine {
    max_read_bytes: Option<u64>,
}

impl LogTailEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the bytes consumed by one poll; the rest waits for the next poll.
    pub fn with_max_read_bytes(mut self, max_read_bytes: u64) -> Self {
        self.max_read_bytes = Some(max_read_bytes.max(1));
        self
    }

    pub fn max_read_bytes(&self) -> Option<u64> {
        self.max_read_bytes
    }

    pub fn poll(&self, source: &LogSource, filter: FilterSpec) -> Result<PollOutcome> {
        self.poll_at(source, filter, Utc::now())
    }

    /// Polls until the offset stops moving and returns everything at once.
    /// A read cap only bounds each step, so nothing past it is dropped.
    pub fn drain(&self, source: &LogSource, filter: FilterSpec) -> Result<PollOutcome> {
        self.drain_at(source, filter, Utc::now())
    }

    pub fn drain_at(
        &self,
        source: &LogSource,
        filter: FilterSpec,
        ingested_at: DateTime<Utc>,
    ) -> Result<PollOutcome> {
        let mut cursor = source.clone();
        let mut drained = self.poll_at(&cursor, filter, ingested_at)?;
        cursor.advance(&drained);

        loop {
            let step = self.poll_at(&cursor, filter, ingested_at)?;
            if step.new_offset == cursor.last_offset {
                break;
            }
            cursor.advance(&step);
            drained.entries.extend(step.entries);
            drained.truncated |= step.truncated;
        }

        drained.new_offset = cursor.last_offset;
        Ok(drained)
    }

    /// Like [`poll`](Self::poll) with an explicit ingestion time for lines
    /// without a usable timestamp.
    pub fn poll_at(
        &self,
        source: &LogSource,
        filter: FilterSpec,
        ingested_at: DateTime<Utc>,
    ) -> Result<PollOutcome> {
        let path = source.path.as_path();
        let metadata = fs::metadata(path).map_err(|e| Error::not_accessible(path, e))?;
        if !metadata.is_file() {
            return Err(Error::not_accessible(
                path,
                std::io::Error::other("not a regular file"),
            ));
        }
        let current_size = metadata.len();

        let truncated = detect_file_truncation(current_size, source.last_offset);
        let start = if truncated {
            tracing::info!(
                path = %path.display(),
                last_offset = source.last_offset,
                current_size,
                "log file shrank, reading from the start"
            );
            0
        } else {
            source.last_offset
        };

        let Some(available) = calculate_bytes_to_read(current_size, start) else {
            return Ok(PollOutcome {
                entries: Vec::new(),
                new_offset: start,
                truncated,
            });
        };
        let to_read = self.max_read_bytes.map_or(available, |cap| available.min(cap));

        let buf = read_range(path, start, to_read)?;
        let hit_cap = to_read < available && buf.len() as u64 == to_read;
        let consumed = complete_prefix_len(&buf, hit_cap);

        let mut entries = Vec::new();
        let mut classified = 0usize;
        for line in split_complete_lines(&buf[..consumed]) {
            classified += 1;
            let entry = classify_line(&line, ingested_at);
            if filter.admits(entry.level) {
                entries.push(entry);
            }
        }

        let new_offset = start + consumed as u64;
        tracing::debug!(
            path = %path.display(),
            start,
            new_offset,
            read = buf.len(),
            classified,
            returned = entries.len(),
            "polled log file"
        );

        Ok(PollOutcome {
            entries,
            new_offset,
            truncated,
        })
    }
}

/// Open, seek and read up to `len` bytes. The handle is dropped on return.
fn read_range(path: &Path, start: u64, len: u64) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| Error::not_accessible(path, e))?;
    file.seek(SeekFrom::Start(start))
        .map_err(|e| Error::not_accessible(path, e))?;

    let mut buf = Vec::new();
    file.take(len)
        .read_to_end(&mut buf)
        .map_err(|e| Error::not_accessible(path, e))?;
    Ok(buf)
}

/// Length of the prefix of `buf` that ends on a line boundary. A trailing
/// partial line is left for the next poll, unless `force` is set (a capped
/// read with no newline at all) in which case the whole chunk is taken.
fn complete_prefix_len(buf: &[u8], force: bool) -> usize {
    match buf.iter().rposition(|b| *b == b'\n') {
        Some(idx) => idx + 1,
        None if force => buf.len(),
        None => 0,
    }
}

/// Split on `\n`, strip a trailing `\r`, drop whitespace-only lines.
fn split_complete_lines(content: &[u8]) -> impl Iterator<Item = Cow<'_, str>> {
    content
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .map(String::from_utf8_lossy)
        .filter(|line| !line.trim().is_empty())
}

/// Detect if the file was truncated by comparing current size with last position
fn detect_file_truncation(current_size: u64, last_position: u64) -> bool {
    current_size < last_position
}

/// Calculate bytes to read based on current size and last position
fn calculate_bytes_to_read(current_size: u64, last_position: u64) -> Option<u64> {
    if current_size <= last_position {
        None
    } else {
        Some(current_size - last_position)
    }
}
