//! Incremental tailing and severity classification of WordPress / PHP logs.
//!
//! The core is [`LogTailEngine::poll`]: given a file and the byte offset
//! already delivered, it reads only what was appended since, classifies each
//! complete line into a [`LogEntry`] and returns the offset to resume from.
//! A file that shrank (rotation, truncation) is re-read from the start; a
//! trailing half-written line is left for the next poll.
//!
//! # Example
//!
//! ```rust,no_run
//! use wp_log_tail::{FilterSpec, Level, LogSource, LogTailEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = LogTailEngine::new();
//!     let mut source = LogSource::new("/var/www/html/wp-content/debug.log");
//!
//!     let outcome = engine.poll(&source, FilterSpec::new(Level::Warning))?;
//!     for entry in &outcome.entries {
//!         println!("{} {} {}", entry.timestamp, entry.level, entry.message);
//!     }
//!     source.advance(&outcome);
//!
//!     Ok(())
//! }
//! ```

mod allowlist;
mod classify;
mod entry;
mod error;
mod level;
mod stream;
mod tail;
mod watcher;

pub mod config;
pub mod logging;
pub mod server;

#[cfg(test)]
mod test_helpers;

pub use allowlist::AllowList;
pub use classify::{classify_line, parse_timestamp};
pub use entry::LogEntry;
pub use error::{Error, Result};
pub use level::{FilterSpec, Level, UnknownLevel};
pub use stream::{FollowOptions, LogStream};
pub use tail::{LogSource, LogTailEngine, PollOutcome};

/// Follows `source`, yielding batches of new entries that pass `filter`.
///
/// Must be called from within a tokio runtime.
///
/// # Example
///
/// ```rust,no_run
/// use wp_log_tail::{FilterSpec, LogSource, watch_log};
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = LogSource::at_end("/var/log/php/error.log")?;
///     let mut stream = watch_log(source, FilterSpec::default());
///
///     while let Some(batch) = stream.next().await {
///         for entry in batch? {
///             println!("{} {}", entry.level, entry.message);
///         }
///     }
///
///     Ok(())
/// }
/// ```
pub fn watch_log(source: LogSource, filter: FilterSpec) -> LogStream {
    LogStream::new(
        source,
        FollowOptions {
            filter,
            ..FollowOptions::default()
        },
    )
}
