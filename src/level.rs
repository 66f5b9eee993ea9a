//! Severity levels and the minimum-level filter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed, ordered severity set. Declaration order is the filter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Fatal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Notice => "notice",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    /// Maps a level label as written by PHP, WordPress plugins or syslog-style
    /// loggers onto the fixed set. Case-insensitive; surrounding whitespace is
    /// ignored. Returns `None` for labels with no sensible mapping.
    pub fn from_label(label: &str) -> Option<Level> {
        let label = label.trim().to_ascii_lowercase();
        let level = match label.as_str() {
            "debug" | "trace" => Level::Debug,
            "info" | "information" => Level::Info,
            "notice" | "deprecated" | "strict" | "strict standards" => Level::Notice,
            "warning" | "warn" => Level::Warning,
            "error" | "err" | "catchable fatal" | "recoverable fatal" => Level::Error,
            "fatal" | "parse" | "crit" | "critical" | "alert" | "emerg" | "emergency" => {
                Level::Fatal
            }
            _ => return None,
        };
        Some(level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when a filter level name is not one of the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for Level {
    type Err = UnknownLevel;

    /// Parses the canonical names only (`debug` … `fatal`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

/// Minimum severity (inclusive) an entry needs to be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub min_level: Level,
}

impl FilterSpec {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }

    /// Admits everything.
    pub fn all() -> Self {
        Self::new(Level::Debug)
    }

    pub fn admits(&self, level: Level) -> bool {
        level >= self.min_level
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}
