//! Follow mode: a stream of classified batches for one log file.
//!
//! A single background task owns the file's [`LogSource`], so polls of one
//! file are always serialised. It polls once straight away, then whenever the
//! watcher reports a change or the poll interval elapses.

use crate::entry::LogEntry;
use crate::error::{Error, Result};
use crate::level::FilterSpec;
use crate::tail::{LogSource, LogTailEngine};
use crate::watcher::FileWatcher;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// How a [`LogStream`] polls its file.
#[derive(Debug, Clone)]
pub struct FollowOptions {
    pub filter: FilterSpec,
    /// Upper bound between polls when no change notification arrives.
    pub poll_interval: Duration,
    pub engine: LogTailEngine,
}

impl Default for FollowOptions {
    fn default() -> Self {
        Self {
            filter: FilterSpec::default(),
            poll_interval: Duration::from_secs(2),
            engine: LogTailEngine::new(),
        }
    }
}

/// Yields each non-empty batch of new entries, oldest first.
///
/// An inaccessible file is reported once per outage as
/// [`Error::NotAccessible`]; the stream keeps polling and resumes when the
/// file comes back.
pub struct LogStream {
    receiver: mpsc::UnboundedReceiver<Result<Vec<LogEntry>>>,
    _shutdown_tx: broadcast::Sender<()>,
    _task_handle: JoinHandle<()>,
}

impl LogStream {
    /// Must be called from within a tokio runtime.
    pub fn new(source: LogSource, options: FollowOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task_handle = tokio::spawn(follow_task(source, options, tx, shutdown_rx));

        LogStream {
            receiver: rx,
            _shutdown_tx: shutdown_tx,
            _task_handle: task_handle,
        }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        let _ = self._shutdown_tx.send(());
    }
}

impl Stream for LogStream {
    type Item = Result<Vec<LogEntry>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

async fn follow_task(
    mut source: LogSource,
    options: FollowOptions,
    tx: mpsc::UnboundedSender<Result<Vec<LogEntry>>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut watcher = match FileWatcher::watch(&source.path) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(
                path = %source.path.display(),
                error = %e,
                "file watcher unavailable, relying on interval polling"
            );
            None
        }
    };

    let mut ticker = tokio::time::interval(options.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failing = false;

    loop {
        let changed = tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => None,
            changed = next_change(&mut watcher) => Some(changed),
        };

        match changed {
            None => {}
            Some(Some(Ok(()))) => ticker.reset(),
            Some(Some(Err(e))) => {
                tracing::warn!(error = %e, "file watcher failed, relying on interval polling");
                watcher = None;
                continue;
            }
            Some(None) => {
                watcher = None;
                continue;
            }
        }

        if !poll_and_send(&mut source, &options, &tx, &mut failing).await {
            break;
        }
    }
}

/// Never resolves when there is no watcher.
async fn next_change(watcher: &mut Option<FileWatcher>) -> Option<notify::Result<()>> {
    match watcher {
        Some(watcher) => watcher.changed().await,
        None => std::future::pending().await,
    }
}

/// Runs one poll off the async runtime. Returns false once nobody is
/// listening any more.
async fn poll_and_send(
    source: &mut LogSource,
    options: &FollowOptions,
    tx: &mpsc::UnboundedSender<Result<Vec<LogEntry>>>,
    failing: &mut bool,
) -> bool {
    let engine = options.engine.clone();
    let filter = options.filter;
    let snapshot = source.clone();

    let polled = tokio::task::spawn_blocking(move || engine.poll(&snapshot, filter))
        .await
        .unwrap_or_else(|join_err| Err(Error::Io(std::io::Error::other(join_err))));

    match polled {
        Ok(outcome) => {
            if *failing {
                tracing::info!(path = %source.path.display(), "log file accessible again");
                *failing = false;
            }
            source.advance(&outcome);
            outcome.entries.is_empty() || tx.send(Ok(outcome.entries)).is_ok()
        }
        Err(e) if e.is_not_accessible() => {
            if *failing {
                return !tx.is_closed();
            }
            tracing::warn!(path = %source.path.display(), error = %e, "log file not accessible");
            *failing = true;
            tx.send(Err(e)).is_ok()
        }
        Err(e) => tx.send(Err(e)).is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::test_helpers::TempLogFile;
    use tokio_stream::StreamExt;

    fn fast() -> FollowOptions {
        FollowOptions {
            filter: FilterSpec::all(),
            poll_interval: Duration::from_millis(20),
            engine: LogTailEngine::new(),
        }
    }

    async fn next_batch(stream: &mut LogStream) -> Result<Vec<LogEntry>> {
        tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for a batch")
            .expect("stream ended")
    }

    fn messages(batch: &[LogEntry]) -> Vec<&str> {
        batch.iter().map(|e| e.message.as_str()).collect()
    }

    #[tokio::test]
    async fn test_backlog_then_appends() {
        let file = TempLogFile::with_lines(&["first", "second"]).unwrap();
        let mut stream = LogStream::new(LogSource::new(file.path()), fast());

        let batch = next_batch(&mut stream).await.unwrap();
        assert_eq!(messages(&batch), vec!["first", "second"]);

        file.append_line("third").unwrap();
        let batch = next_batch(&mut stream).await.unwrap();
        assert_eq!(messages(&batch), vec!["third"]);
    }

    #[tokio::test]
    async fn test_at_end_skips_backlog() {
        let file = TempLogFile::with_lines(&["old"]).unwrap();
        let mut stream = LogStream::new(LogSource::at_end(file.path()).unwrap(), fast());

        tokio::time::sleep(Duration::from_millis(50)).await;
        file.append_line("new").unwrap();

        let batch = next_batch(&mut stream).await.unwrap();
        assert_eq!(messages(&batch), vec!["new"]);
    }

    #[tokio::test]
    async fn test_filter_applies_to_batches() {
        let file = TempLogFile::with_lines(&[
            "[2024-01-01 10:00:00] [debug] noise",
            "[2024-01-01 10:00:01] [error] signal",
        ])
        .unwrap();
        let options = FollowOptions {
            filter: FilterSpec::new(Level::Error),
            ..fast()
        };
        let mut stream = LogStream::new(LogSource::new(file.path()), options);

        let batch = next_batch(&mut stream).await.unwrap();
        assert_eq!(messages(&batch), vec!["signal"]);
    }

    #[tokio::test]
    async fn test_missing_file_reported_once_then_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        let mut stream = LogStream::new(LogSource::new(&path), fast());

        let err = next_batch(&mut stream).await.unwrap_err();
        assert!(err.is_not_accessible());

        // Several failing polls pass without further errors.
        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, "back again\n").unwrap();

        let batch = next_batch(&mut stream).await.unwrap();
        assert_eq!(messages(&batch), vec!["back again"]);
    }

    #[tokio::test]
    async fn test_rotation_is_followed() {
        let file = TempLogFile::with_lines(&["before rotation, quite a long line"]).unwrap();
        let mut stream = LogStream::new(LogSource::new(file.path()), fast());
        next_batch(&mut stream).await.unwrap();

        file.truncate().unwrap();
        file.append_line("after").unwrap();

        let batch = next_batch(&mut stream).await.unwrap();
        assert_eq!(messages(&batch), vec!["after"]);
    }

    #[tokio::test]
    async fn test_drop_stops_task() {
        let file = TempLogFile::with_lines(&["line"]).unwrap();
        let stream = LogStream::new(LogSource::new(file.path()), fast());
        assert!(!stream.is_closed());

        drop(stream);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
