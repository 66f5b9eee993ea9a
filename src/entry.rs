//! The classified output record.

use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One classified log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Parsed from the line when possible, otherwise the ingestion time.
    pub timestamp: DateTime<Utc>,
    /// False when `timestamp` is the ingestion time.
    #[serde(skip)]
    pub timestamp_parsed: bool,
    pub level: Level,
    pub message: String,
    /// The line as read, minus its line terminator.
    #[serde(skip)]
    pub raw: String,
}
