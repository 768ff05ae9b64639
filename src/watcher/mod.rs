/// Directory watcher module
///
/// - Quiet-period timer (debounce.rs)
/// - Self-write suppression shared with the library (guard.rs)
/// - Rescan and diff against the catalog (reconcile.rs)
/// - The notify-backed driver below, which feeds OS events into the reconciler

pub mod debounce;
pub mod guard;
pub mod reconcile;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::metadata::store::TEMP_PREFIX;
use crate::state::{Catalog, CatalogError, ChangeSet};

pub use debounce::Debouncer;
pub use guard::{SelfWriteGuard, WriteTicket};
pub use reconcile::{Reconciler, Reconciliation};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to watch folder: {0}")]
    Notify(#[from] notify::Error),

    #[error("Only folders can be watched, not file lists")]
    NotAFolder,

    #[error("Folder event stream closed")]
    Closed,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Watches the catalog's folder and applies external changes to it
pub struct FolderWatcher {
    /// Dropping the notify handle stops the OS subscription
    _watcher: Option<RecommendedWatcher>,
    events: mpsc::UnboundedReceiver<Vec<PathBuf>>,
    reconciler: Reconciler,
}

impl FolderWatcher {
    /// Start watching the folder the catalog was loaded from
    pub fn watch(catalog: &Catalog, guard: SelfWriteGuard, delay: Duration) -> Result<Self, WatchError> {
        let folder = catalog.source().folder().ok_or(WatchError::NotAFolder)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_relevant(&event) {
                    let _ = tx.send(event.paths);
                }
            }
            Err(e) => tracing::warn!(error = %e, "⚠️  watcher error"),
        })?;
        watcher.watch(folder, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %folder.display(), "👀 watching");
        Ok(Self::from_channel(Some(watcher), rx, guard, delay))
    }

    /// Driver over an existing event channel
    pub fn from_channel(
        watcher: Option<RecommendedWatcher>,
        events: mpsc::UnboundedReceiver<Vec<PathBuf>>,
        guard: SelfWriteGuard,
        delay: Duration,
    ) -> Self {
        Self {
            _watcher: watcher,
            events,
            reconciler: Reconciler::new(Debouncer::new(delay), guard),
        }
    }

    /// Wait for the next external change and apply it to `catalog`
    ///
    /// Bursts are coalesced into one rescan. Passes that find nothing new,
    /// including bursts caused only by our own writes, keep waiting.
    pub async fn next_change(&mut self, catalog: &mut Catalog) -> Result<ChangeSet, WatchError> {
        let mut closed = false;
        loop {
            let deadline = self.reconciler.deadline();
            if closed && deadline.is_none() {
                return Err(WatchError::Closed);
            }
            let wake_at = deadline
                .map(tokio::time::Instant::from_std)
                .unwrap_or_else(tokio::time::Instant::now);

            tokio::select! {
                received = self.events.recv(), if !closed => match received {
                    Some(paths) => {
                        tracing::debug!(?paths, "folder event");
                        self.reconciler.on_signal(Instant::now());
                    }
                    None => closed = true,
                },
                _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => {
                    if let Reconciliation::Changed(changes) = self.reconciler.poll(Instant::now(), catalog)? {
                        return Ok(changes);
                    }
                }
            }
        }
    }
}

/// Drop reads and events that only touch our own temp files
fn is_relevant(event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.is_empty() || !event.paths.iter().all(|path| is_temp_file(path))
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(TEMP_PREFIX))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Source, ViewResult};
    use notify::event::{AccessKind, CreateKind, ModifyKind};
    use std::fs;
    use tempfile::TempDir;

    const DELAY: Duration = Duration::from_millis(50);

    fn catalog(dir: &Path) -> Catalog {
        fs::write(dir.join("seed.jpg"), b"x").unwrap();
        match Catalog::open(Source::Folder(dir.to_path_buf()), vec!["jpg".to_string()]).unwrap() {
            ViewResult::Images(catalog) => catalog,
            ViewResult::NothingToShow => panic!("seed image missing"),
        }
    }

    #[test]
    fn test_event_filter() {
        let photo = PathBuf::from("/photos/a.jpg");
        let temp = PathBuf::from(format!("/photos/{}x1y2.jpg", TEMP_PREFIX));

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(photo.clone());
        assert!(is_relevant(&created));

        let read = Event::new(EventKind::Access(AccessKind::Read)).add_path(photo.clone());
        assert!(!is_relevant(&read));

        let temp_only = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(temp.clone());
        assert!(!is_relevant(&temp_only));

        let swap = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(temp)
            .add_path(photo);
        assert!(is_relevant(&swap));
    }

    #[tokio::test]
    async fn test_burst_becomes_one_change() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog(dir.path());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = FolderWatcher::from_channel(None, rx, SelfWriteGuard::new(), DELAY);

        for i in 0..5 {
            let path = dir.path().join(format!("n{}.jpg", i));
            fs::write(&path, b"x").unwrap();
            tx.send(vec![path]).unwrap();
        }

        let changes = tokio::time::timeout(Duration::from_secs(5), watcher.next_change(&mut catalog))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(changes.added.len(), 5);
        assert_eq!(catalog.all().len(), 6);
    }

    #[tokio::test]
    async fn test_self_write_then_external_change() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog(dir.path());
        let guard = SelfWriteGuard::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = FolderWatcher::from_channel(None, rx, guard.clone(), DELAY);

        drop(guard.begin());
        tx.send(vec![dir.path().join("seed.jpg")]).unwrap();

        // The self-write burst changes nothing; only the external removal surfaces
        let external = dir.path().join("seed.jpg");
        let tx2 = tx.clone();
        let path = external.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DELAY * 4).await;
            fs::remove_file(&path).unwrap();
            tx2.send(vec![path]).unwrap();
        });

        let changes = tokio::time::timeout(Duration::from_secs(5), watcher.next_change(&mut catalog))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(changes.removed, vec![external]);
        assert!(changes.added.is_empty());
    }

    #[tokio::test]
    async fn test_closed_channel_ends_watch() {
        let dir = TempDir::new().unwrap();
        let mut catalog = catalog(dir.path());
        let (tx, rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();
        let mut watcher = FolderWatcher::from_channel(None, rx, SelfWriteGuard::new(), DELAY);
        drop(tx);

        let result = watcher.next_change(&mut catalog).await;
        assert!(matches!(result, Err(WatchError::Closed)));
    }

    #[test]
    fn test_file_list_cannot_be_watched() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"x").unwrap();
        let catalog = match Catalog::open(Source::Files(vec![file]), vec!["jpg".to_string()]).unwrap() {
            ViewResult::Images(catalog) => catalog,
            ViewResult::NothingToShow => panic!("file missing"),
        };

        let result = FolderWatcher::watch(&catalog, SelfWriteGuard::new(), DELAY);
        assert!(matches!(result, Err(WatchError::NotAFolder)));
    }
}
