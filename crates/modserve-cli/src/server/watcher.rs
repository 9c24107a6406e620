//! Recursive file watching for the reload channel.
//!
//! Change events from notify's platform backend are filtered (ignore
//! patterns, hidden paths) and debounced per path before being
//! forwarded, so the event burst an editor emits on save collapses to
//! one reload without masking a concurrent save to a different file.
//!
//! node_modules is deliberately watched: package installs and edits
//! must reach the run loop so stale specifier resolutions get dropped.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::Result;

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A debounced change to one path under the watch root.
#[derive(Debug, Clone)]
pub struct FileChange {
    path: PathBuf,
    kind: ChangeKind,
}

impl FileChange {
    /// The affected path, as reported by the platform watcher.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }
}

/// Suppresses repeat events for the same path inside a time window.
///
/// Each path carries its own clock: alternating saves to two files are
/// both admitted, while the burst a single save produces collapses to
/// its first event.
struct DebounceFilter {
    window: Duration,
    seen: HashMap<PathBuf, Instant>,
}

impl DebounceFilter {
    fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    fn admit(&mut self, path: &Path) -> bool {
        let now = Instant::now();
        match self.seen.get(path) {
            Some(&last) if now.duration_since(last) < self.window => false,
            _ => {
                self.seen.insert(path.to_path_buf(), now);
                true
            }
        }
    }
}

/// Watches a directory tree and forwards debounced change events.
pub struct FileWatcher {
    /// Keeps the OS-level watches registered for the session
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root` recursively.
    ///
    /// Admitted changes arrive on the returned receiver.
    ///
    /// # Errors
    ///
    /// Fails when the platform watcher cannot be created or the root
    /// cannot be registered with it.
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        let (tx, rx) = mpsc::channel(100);

        let mut debounce = DebounceFilter::new(Duration::from_millis(debounce_ms));
        let watch_root = root.clone();

        let mut inner = notify::recommended_watcher(move |outcome: notify::Result<Event>| {
            let event = match outcome {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Watch error: {}", e);
                    return;
                }
            };

            let kind = match event.kind {
                EventKind::Create(_) => ChangeKind::Created,
                EventKind::Modify(_) => ChangeKind::Modified,
                EventKind::Remove(_) => ChangeKind::Removed,
                _ => return,
            };

            for path in event.paths {
                if should_ignore(&path, &watch_root, &ignore_patterns) {
                    continue;
                }
                if !debounce.admit(&path) {
                    continue;
                }
                let _ = tx.blocking_send(FileChange { path, kind });
            }
        })?;

        inner.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _inner: inner,
                root,
            },
            rx,
        ))
    }

    /// The root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Whether a changed path should be dropped before it reaches the
/// reload channel: outside the root, hidden, or matching a configured
/// ignore pattern (`*.ext` suffix or a path name like `.git`).
fn should_ignore(path: &Path, root: &Path, patterns: &[String]) -> bool {
    let rel = match path.strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) => return true,
    };

    if rel.components().any(is_hidden_component) {
        return true;
    }

    let rel = rel.to_string_lossy();
    patterns.iter().any(|p| matches_pattern(&rel, p))
}

fn is_hidden_component(component: Component<'_>) -> bool {
    match component.as_os_str().to_str() {
        Some(name) => name.starts_with('.') && name != "." && name != "..",
        None => false,
    }
}

fn matches_pattern(rel: &str, pattern: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        return rel.ends_with(suffix);
    }
    rel == pattern
        || rel.starts_with(&format!("{}/", pattern))
        || rel.ends_with(&format!("/{}", pattern))
        || rel.contains(&format!("/{}/", pattern))
}
