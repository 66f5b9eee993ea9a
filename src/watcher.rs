//! Change notifications for a single log file, via the notify crate.

use crate::error::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Watches the parent directory of a log file so that rotation (remove and
/// recreate) is seen as well as appends.
pub(crate) struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
    file_name: String,
}

impl FileWatcher {
    pub(crate) fn watch<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&watch_dir(&file_path), RecursiveMode::NonRecursive)?;

        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            file_name,
        })
    }

    /// Waits for the next event that may have changed the file's content.
    /// `None` once the watcher has shut down.
    pub(crate) async fn changed(&mut self) -> Option<notify::Result<()>> {
        loop {
            match self.receiver.recv().await? {
                Ok(event) if is_content_change(&event, &self.file_name) => return Some(Ok(())),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn watch_dir(file_path: &Path) -> PathBuf {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// True when `event` touches `target_file_name` in a way that can change
/// what a poll would read. Access events are ignored.
pub(crate) fn is_content_change(event: &Event, target_file_name: &str) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    );
    relevant_kind
        && event.paths.iter().any(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy() == target_file_name)
                .unwrap_or(false)
        })
}
