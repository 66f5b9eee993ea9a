//! Configuration for the poll server and follow mode.
//!
//! [`Config::load`] reads a TOML file; every section and key is optional and
//! falls back to the values in [`DEFAULT_CONFIG`]. [`Config::defaults`]
//! returns the same defaults without touching the filesystem.

use crate::error::{Error, Result};
use crate::level::{FilterSpec, Level};
use crate::tail::LogTailEngine;
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Reference configuration, printed by `wp-log-tail config`.
pub const DEFAULT_CONFIG: &str = r#"
[server]
bind               = "127.0.0.1:8087"
request_timeout_ms = 5000

[tail]
poll_interval_ms = 2000
max_read_bytes   = 4194304
default_level    = "info"

[logging]
# level = "debug"

# Files the HTTP endpoint may read. Requests name a file by `name` or by
# its exact configured `path`; anything else is rejected.
# [[logs]]
# name = "debug"
# path = "/var/www/html/wp-content/debug.log"
"#;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tail: TailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub logs: Vec<LogFileConfig>,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8087))
}
fn default_request_timeout_ms() -> u64 { 5000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// `[tail]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TailConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: u64,
    #[serde(default = "default_level")]
    pub default_level: Level,
}

fn default_poll_interval_ms() -> u64 { 2000 }
fn default_max_read_bytes() -> u64 { 4 * 1024 * 1024 }
fn default_level() -> Level { Level::Info }

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_read_bytes: default_max_read_bytes(),
            default_level: default_level(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive, e.g. `"debug"` or `"wp_log_tail=trace"`.
    pub level: Option<String>,
}

/// One `[[logs]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogFileConfig {
    pub name: String,
    pub path: PathBuf,
}

impl Config {
    pub fn defaults() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::Config { message });

        if self.server.request_timeout_ms == 0 {
            return invalid("server.request_timeout_ms must be positive".into());
        }
        if self.tail.poll_interval_ms == 0 {
            return invalid("tail.poll_interval_ms must be positive".into());
        }
        if self.tail.max_read_bytes == 0 {
            return invalid("tail.max_read_bytes must be positive".into());
        }

        let mut names = HashSet::new();
        for log in &self.logs {
            if log.name.trim().is_empty() {
                return invalid("logs.name must not be empty".into());
            }
            if !log.path.is_absolute() {
                return invalid(format!(
                    "logs.path for '{}' must be absolute: {}",
                    log.name,
                    log.path.display()
                ));
            }
            if !names.insert(log.name.as_str()) {
                return invalid(format!("duplicate log name '{}'", log.name));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.tail.poll_interval_ms)
    }

    pub fn default_filter(&self) -> FilterSpec {
        FilterSpec::new(self.tail.default_level)
    }

    pub fn engine(&self) -> LogTailEngine {
        LogTailEngine::new().with_max_read_bytes(self.tail.max_read_bytes)
    }
}
