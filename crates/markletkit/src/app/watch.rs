//! Rebuild on source changes.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::app::build::{BuildOptions, Builder};

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Watches the unit tree and the helper library, rebuilding after each burst
/// of changes.
pub struct BuildWatcher {
    options: BuildOptions,
}

impl BuildWatcher {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Build once, then block forever rebuilding on change.
    pub fn run(&self) -> Result<()> {
        self.rebuild();

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher =
            notify::recommended_watcher(tx).context("failed to create file watcher")?;
        watcher
            .watch(&self.options.source_dir, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", self.options.source_dir.display()))?;
        if self.options.helpers_path.exists() {
            watcher
                .watch(&self.options.helpers_path, RecursiveMode::NonRecursive)
                .with_context(|| {
                    format!("failed to watch {}", self.options.helpers_path.display())
                })?;
        }
        tracing::info!(source = %self.options.source_dir.display(), "watching for changes");

        let mut pending: Option<Instant> = None;
        loop {
            let wait = match pending {
                Some(since) => DEBOUNCE.saturating_sub(since.elapsed()),
                None => Duration::from_secs(3600),
            };
            match rx.recv_timeout(wait) {
                Ok(Ok(event)) => {
                    if is_relevant(&event, &self.options.out_dir) {
                        tracing::debug!(paths = ?event.paths, "change detected");
                        pending.get_or_insert_with(Instant::now);
                    }
                }
                Ok(Err(err)) => tracing::warn!(error = %err, "watch error"),
                Err(RecvTimeoutError::Timeout) => {
                    if pending.take().is_some() {
                        self.rebuild();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }
    }

    fn rebuild(&self) {
        let outcome = Builder::new(self.options.clone()).and_then(|builder| builder.build());
        match outcome {
            Ok(report) => tracing::info!(
                built = report.packaged.len(),
                failed = report.failures.len(),
                "rebuild finished"
            ),
            Err(err) => tracing::error!(error = %format_args!("{err:#}"), "rebuild failed"),
        }
    }
}

/// Whether an event touches inputs rather than our own output.
pub fn is_relevant(event: &Event, out_dir: &Path) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|path| !within(path, out_dir))
}

fn within(path: &Path, dir: &Path) -> bool {
    if path.starts_with(dir) {
        return true;
    }
    match (absolute(path), absolute(dir)) {
        (Some(path), Some(dir)) => path.starts_with(dir),
        _ => false,
    }
}

fn absolute(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        std::env::current_dir().ok().map(|cwd| cwd.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn source_edits_are_relevant() {
        let out = Path::new("/work/dist");
        let edit = event(EventKind::Modify(ModifyKind::Any), "/work/src/stats/index.js");
        assert!(is_relevant(&edit, out));
    }

    #[test]
    fn output_writes_and_reads_are_ignored() {
        let out = Path::new("/work/dist");
        let write = event(EventKind::Create(CreateKind::File), "/work/dist/stats.js");
        let read = event(EventKind::Access(AccessKind::Any), "/work/src/stats/index.js");
        assert!(!is_relevant(&write, out));
        assert!(!is_relevant(&read, out));
    }
}
