//! The set of log files remote callers may poll.
//!
//! Requests are matched by exact string against a configured name or path.
//! Nothing is canonicalised or touched on disk, so a rejected request learns
//! nothing about which paths exist.

use crate::config::LogFileConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: Vec<LogFileConfig>,
}

impl AllowList {
    pub fn new(entries: impl IntoIterator<Item = LogFileConfig>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Convenience for a single `name -> path` pair.
    pub fn with(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.entries.push(LogFileConfig {
            name: name.into(),
            path: path.into(),
        });
        self
    }

    /// Path for `requested`, which may be a configured name or the exact
    /// configured path.
    pub fn resolve(&self, requested: &str) -> Option<&Path> {
        if requested.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.name == requested || entry.path.as_os_str() == requested)
            .map(|entry| entry.path.as_path())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
