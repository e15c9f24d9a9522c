//! File watching for rebuilds.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Page or template source was modified
    ContentModified(PathBuf),

    /// Stylesheet was modified
    StyleModified(PathBuf),

    /// File was created
    Created(PathBuf),

    /// File was deleted
    Deleted(PathBuf),

    /// Generic modification
    Modified(PathBuf),
}

impl WatchEvent {
    /// The changed path.
    pub fn path(&self) -> &Path {
        match self {
            Self::ContentModified(path)
            | Self::StyleModified(path)
            | Self::Created(path)
            | Self::Deleted(path)
            | Self::Modified(path) => path,
        }
    }
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths.
    ///
    /// Events arriving within `debounce` of the previous one are dropped, as
    /// are events under any of the `ignored` directories. Returns the watcher
    /// and a channel to receive events.
    pub fn new(
        paths: &[PathBuf],
        debounce: Duration,
        ignored: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::debug!("Not watching missing path {}", path.display());
            }
        }

        let ignored = ignored.to_vec();
        std::thread::spawn(move || {
            let mut last_event_time: Option<Instant> = None;

            while let Ok(event) = sync_rx.recv() {
                let paths: Vec<&PathBuf> = event
                    .paths
                    .iter()
                    .filter(|p| !ignored.iter().any(|dir| p.starts_with(dir)))
                    .collect();
                if paths.is_empty() {
                    continue;
                }

                let now = Instant::now();
                if let Some(last) = last_event_time {
                    if now.duration_since(last) < debounce {
                        continue;
                    }
                }
                last_event_time = Some(now);

                for path in paths {
                    if let Some(e) = classify_event(path, &event.kind) {
                        if async_tx.blocking_send(e).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Classify a notify event into a WatchEvent.
fn classify_event(path: &Path, kind: &notify::EventKind) -> Option<WatchEvent> {
    use notify::EventKind;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path.to_path_buf())),
        EventKind::Remove(_) => Some(WatchEvent::Deleted(path.to_path_buf())),
        EventKind::Modify(_) => match ext {
            "md" | "njk" | "html" | "json" => Some(WatchEvent::ContentModified(path.to_path_buf())),
            "css" => Some(WatchEvent::StyleModified(path.to_path_buf())),
            _ => Some(WatchEvent::Modified(path.to_path_buf())),
        },
        _ => None,
    }
}
