//! Watching a Markdown buffer on disk for external edits.
//!
//! Uses the notify crate for cross-platform file system events. Changes
//! are debounced, then the file is re-read and its anchors re-parsed so a
//! host can feed the result to the controller as `BufferChanged`.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::index::AnchorIndex;
use crate::persist::{PersistError, load_buffer};

/// Debounce used by the `watch` command.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Fresh contents of a watched buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferUpdate {
    pub text: String,
    pub index: AnchorIndex,
}

/// Watches a single buffer file and reports debounced changes.
pub struct BufferWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    debounce: Duration,
    pending_since: Option<Instant>,
}

impl BufferWatcher {
    /// Create a watcher for `path`.
    ///
    /// # Errors
    /// Returns an error if the file watcher cannot be created or the path cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // Event paths from the OS are canonical; match them against a canonical target.
        let target_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;
        debug!(target = %target_path.display(), root = %watch_root.display(), "watching buffer");

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            debounce,
            pending_since: None,
        })
    }

    /// The canonical path of the file being watched.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Returns true once a debounced file change is ready.
    pub fn take_change_ready(&mut self) -> bool {
        let mut saw_relevant_event = false;
        let mut total_events = 0u32;
        let mut irrelevant_events = 0u32;
        while let Ok(event) = self.rx.try_recv() {
            total_events += 1;
            match event {
                Ok(ev) if self.is_relevant(&ev) => saw_relevant_event = true,
                Ok(ev) => {
                    irrelevant_events += 1;
                    trace!(kind = ?ev.kind, paths = ?ev.paths, "irrelevant watch event");
                }
                Err(err) => warn!(%err, "watch error"),
            }
        }

        if total_events > 0 {
            trace!(
                total = total_events,
                relevant = saw_relevant_event,
                irrelevant = irrelevant_events,
                "watcher poll"
            );
        }

        if saw_relevant_event {
            self.pending_since = Some(Instant::now());
        }

        let Some(pending_since) = self.pending_since else {
            return false;
        };
        if pending_since.elapsed() >= self.debounce {
            self.pending_since = None;
            return true;
        }
        false
    }

    /// Re-read the buffer if a debounced change is ready.
    ///
    /// # Errors
    /// Returns an error if the changed file cannot be read.
    pub fn poll(&mut self) -> Result<Option<BufferUpdate>, PersistError> {
        if !self.take_change_ready() {
            return Ok(None);
        }
        let text = load_buffer(&self.target_path)?;
        let index = AnchorIndex::build(&text);
        debug!(anchors = index.len(), "watched buffer re-parsed");
        Ok(Some(BufferUpdate { text, index }))
    }

    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use tempfile::tempdir;

    const ANCHORED: &str = "<!-- @block:block_001 100,50,400,30 -->\n# Title\n";

    #[test]
    fn test_directory_level_event_is_relevant_for_watched_file() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("doc.md");
        std::fs::write(&path, ANCHORED).expect("write");
        let watcher = BufferWatcher::new(&path, Duration::from_millis(10)).expect("watcher");

        let event = Event {
            kind: EventKind::Any,
            paths: vec![canonical_dir],
            attrs: notify::event::EventAttributes::new(),
        };

        assert!(
            watcher.is_relevant(&event),
            "directory-level events should count as relevant for many backends"
        );
    }

    #[test]
    fn test_unrelated_file_event_is_ignored() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("doc.md");
        std::fs::write(&path, ANCHORED).expect("write");
        let watcher = BufferWatcher::new(&path, Duration::from_millis(10)).expect("watcher");

        let event = Event {
            kind: EventKind::Any,
            paths: vec![canonical_dir.join("other.md")],
            attrs: notify::event::EventAttributes::new(),
        };
        assert!(!watcher.is_relevant(&event));
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        let root = watch_root_for(Path::new("notes.md"));
        assert_eq!(root, PathBuf::from("."));
    }

    #[test]
    fn test_poll_without_change_is_none() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.md");
        std::fs::write(&path, ANCHORED).expect("write");
        let mut watcher = BufferWatcher::new(&path, Duration::from_millis(10)).expect("watcher");
        assert!(watcher.poll().expect("poll").is_none());
    }

    #[test]
    fn test_real_modification_is_reparsed() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("doc.md");
        std::fs::write(&path, "no anchors yet").expect("write");

        let mut watcher = BufferWatcher::new(&path, Duration::from_millis(50)).expect("watcher");

        // Give the backend time to register the watch
        std::thread::sleep(Duration::from_millis(500));

        std::fs::write(&path, ANCHORED).expect("write");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut update = None;
        while Instant::now() < deadline {
            if let Some(found) = watcher.poll().expect("poll") {
                update = Some(found);
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        let update = update.expect("watcher should report the edit within 5 seconds");
        assert_eq!(update.text, ANCHORED);
        assert_eq!(update.index.len(), 1);
    }

    #[test]
    fn test_canonical_event_path_matches_relative_watcher() {
        let dir = tempdir().expect("tempdir");
        let relative_path = dir.path().join("doc.md");
        std::fs::write(&relative_path, ANCHORED).expect("write");
        let watcher =
            BufferWatcher::new(&relative_path, Duration::from_millis(10)).expect("watcher");

        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let event = Event {
            kind: EventKind::Any,
            paths: vec![canonical_dir],
            attrs: notify::event::EventAttributes::new(),
        };

        assert!(
            watcher.is_relevant(&event),
            "canonical event paths should match even when watcher was created with non-canonical path"
        );
    }
}
