/// The catalog: which images exist in the active source and which are shown
///
/// `all` mirrors the source on disk. `view` is what the gallery displays:
/// the same list in grid mode, a star-filtered subset in filtered mode, and
/// the list being paged through in single-image mode.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use super::data::{CatalogEntry, ChangeSet, ImageSet, Source, StarFilter, ViewMode, ViewResult};
use super::trash::Trash;
use crate::metadata::store::has_allowed_extension;
use crate::metadata::RecordStore;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Rename target is taken; nothing was changed
    #[error("File already exists at: {0}")]
    AlreadyExists(PathBuf),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("Not in the catalog: {0}")]
    NotInCatalog(PathBuf),

    #[error("Could not move {path} to trash: {source}")]
    Trash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    fn io(path: &Path, source: io::Error) -> Self {
        CatalogError::Io { path: path.to_path_buf(), source }
    }
}

/// Enumerate the images of a source, in listing order
///
/// Folders are read non-recursively; hidden files are skipped.
pub fn load_from(source: &Source, extensions: &[String]) -> Result<ViewResult<ImageSet>, CatalogError> {
    let images = match source {
        Source::Folder(folder) => list_folder(folder, extensions)?,
        Source::Files(files) => {
            let mut images = Vec::new();
            for file in files {
                if !has_allowed_extension(file, extensions) {
                    tracing::debug!(path = %file.display(), "skipping non-image file");
                    continue;
                }
                let meta = fs::metadata(file).map_err(|e| CatalogError::io(file, e))?;
                if meta.is_file() {
                    images.push(file.clone());
                }
            }
            ImageSet::new(images)
        }
    };

    if images.is_empty() {
        Ok(ViewResult::NothingToShow)
    } else {
        Ok(ViewResult::Images(images))
    }
}

fn list_folder(folder: &Path, extensions: &[String]) -> Result<ImageSet, CatalogError> {
    let meta = fs::metadata(folder).map_err(|e| CatalogError::io(folder, e))?;
    if !meta.is_dir() {
        return Err(CatalogError::NotADirectory(folder.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(folder).to_path_buf();
            CatalogError::Io { source: e.into(), path }
        })?;

        if !entry.file_type().is_file() || is_hidden(entry.path()) {
            continue;
        }
        if has_allowed_extension(entry.path(), extensions) {
            images.push(entry.into_path());
        }
    }
    Ok(ImageSet::new(images))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Keep entries whose stored star rating equals the filter
///
/// Unreadable or unrated entries never match. `StarFilter::None` returns
/// the set unchanged.
pub fn filter_by_stars(images: &ImageSet, filter: StarFilter, store: &dyn RecordStore) -> ImageSet {
    let target = match filter {
        StarFilter::None => return images.clone(),
        StarFilter::Stars(stars) => stars,
    };

    images
        .iter()
        .filter(|path| match store.read_record(path) {
            Ok(record) => record.stars == Some(target),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "excluded from filter");
                false
            }
        })
        .cloned()
        .collect()
}

/// In-memory state of the active source
#[derive(Debug)]
pub struct Catalog {
    source: Source,
    extensions: Vec<String>,
    all: ImageSet,
    view: ImageSet,
    mode: ViewMode,
    selected: HashSet<PathBuf>,
    /// Position in `view` of the image shown in single mode
    current: Option<usize>,
}

impl Catalog {
    /// Load a source; an empty source is reported, not returned as an empty catalog
    pub fn open(source: Source, extensions: Vec<String>) -> Result<ViewResult<Catalog>, CatalogError> {
        let all = match load_from(&source, &extensions)? {
            ViewResult::Images(all) => all,
            ViewResult::NothingToShow => return Ok(ViewResult::NothingToShow),
        };

        tracing::info!("📁 loaded {} images", all.len());
        Ok(ViewResult::Images(Self::with_images(source, extensions, all)))
    }

    /// Catalog over an already-enumerated set
    pub fn with_images(source: Source, extensions: Vec<String>, all: ImageSet) -> Self {
        Self {
            source,
            extensions,
            view: all.clone(),
            all,
            mode: ViewMode::Grid,
            selected: HashSet::new(),
            current: None,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn all(&self) -> &ImageSet {
        &self.all
    }

    pub fn view(&self) -> &ImageSet {
        &self.view
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Every image of the source with its display state
    ///
    /// `filtered_in` tells whether the image is part of the current view.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        let shown: HashSet<&PathBuf> = self.view.iter().collect();
        self.all
            .iter()
            .map(|path| CatalogEntry {
                path: path.clone(),
                selected: self.selected.contains(path),
                filtered_in: shown.contains(path),
            })
            .collect()
    }

    // ========== Filtering ==========

    /// Show only images with the given rating, or everything for `StarFilter::None`
    pub fn apply_filter(&mut self, filter: StarFilter, store: &dyn RecordStore) -> ViewResult<&ImageSet> {
        self.selected.clear();
        self.current = None;
        self.mode = match filter {
            StarFilter::None => ViewMode::Grid,
            StarFilter::Stars(stars) => ViewMode::Filtered(stars),
        };
        self.view = filter_by_stars(&self.all, filter, store);

        if self.view.is_empty() {
            ViewResult::NothingToShow
        } else {
            ViewResult::Images(&self.view)
        }
    }

    /// Drop any filter and single-image state
    pub fn show_grid(&mut self) {
        self.mode = ViewMode::Grid;
        self.view = self.all.clone();
        self.selected.clear();
        self.current = None;
    }

    // ========== Selection ==========

    /// Toggle selection of a path in the view; returns the new state
    pub fn toggle_selection(&mut self, path: &Path) -> Result<bool, CatalogError> {
        if !self.view.contains(path) {
            return Err(CatalogError::NotInCatalog(path.to_path_buf()));
        }
        if self.selected.remove(path) {
            Ok(false)
        } else {
            self.selected.insert(path.to_path_buf());
            Ok(true)
        }
    }

    /// Selected paths in view order
    pub fn selected(&self) -> Vec<PathBuf> {
        self.view
            .iter()
            .filter(|path| self.selected.contains(*path))
            .cloned()
            .collect()
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    // ========== Single-image navigation ==========

    /// Switch to single-image mode on `path`
    pub fn open_single(&mut self, path: &Path) -> Result<(), CatalogError> {
        let index = self
            .view
            .position(path)
            .ok_or_else(|| CatalogError::NotInCatalog(path.to_path_buf()))?;
        self.current = Some(index);
        self.mode = ViewMode::Single;
        Ok(())
    }

    pub fn current(&self) -> Option<&Path> {
        self.current
            .and_then(|index| self.view.paths().get(index))
            .map(PathBuf::as_path)
    }

    /// Step forward, staying on the last image at the end
    pub fn next(&mut self) -> Option<&Path> {
        if let Some(index) = self.current {
            if index + 1 < self.view.len() {
                self.current = Some(index + 1);
            }
        }
        self.current()
    }

    /// Step back, staying on the first image at the start
    pub fn previous(&mut self) -> Option<&Path> {
        if let Some(index) = self.current {
            self.current = Some(index.saturating_sub(1));
        }
        self.current()
    }

    // ========== File operations ==========

    /// Rename an image within its folder
    ///
    /// Fails with `AlreadyExists` instead of overwriting. On success the path
    /// is updated in every set that holds it.
    pub fn rename(&mut self, old: &Path, new_name: &str) -> Result<PathBuf, CatalogError> {
        if !self.all.contains(old) && !self.view.contains(old) {
            return Err(CatalogError::NotInCatalog(old.to_path_buf()));
        }
        validate_name(new_name)?;

        let new_path = match old.parent() {
            Some(parent) => parent.join(new_name),
            None => PathBuf::from(new_name),
        };
        if new_path == old {
            return Ok(new_path);
        }
        if new_path.exists() {
            return Err(CatalogError::AlreadyExists(new_path));
        }

        fs::rename(old, &new_path).map_err(|e| CatalogError::io(old, e))?;

        self.all.replace(old, &new_path);
        self.view.replace(old, &new_path);
        if self.selected.remove(old) {
            self.selected.insert(new_path.clone());
        }

        tracing::info!(from = %old.display(), to = %new_path.display(), "renamed");
        Ok(new_path)
    }

    /// Send an image to the trash and forget it
    pub fn delete(&mut self, path: &Path, trash: &dyn Trash) -> Result<(), CatalogError> {
        if !self.all.contains(path) && !self.view.contains(path) {
            return Err(CatalogError::NotInCatalog(path.to_path_buf()));
        }

        trash.discard(path).map_err(|source| CatalogError::Trash {
            path: path.to_path_buf(),
            source,
        })?;

        self.forget(path);
        tracing::info!(path = %path.display(), "🗑️  moved to trash");
        Ok(())
    }

    fn forget(&mut self, path: &Path) {
        let current = self.current().map(Path::to_path_buf);
        self.all.remove(path);
        self.view.remove(path);
        self.selected.remove(path);
        self.restore_current(current.as_deref());
    }

    /// Keep single mode on the same image after the view changed
    fn restore_current(&mut self, current: Option<&Path>) {
        let Some(index) = self.current else { return };
        self.current = match current.and_then(|path| self.view.position(path)) {
            Some(position) => Some(position),
            None if self.view.is_empty() => None,
            None => Some(index.min(self.view.len() - 1)),
        };
    }

    // ========== Reconciliation ==========

    /// Re-enumerate the source as it is on disk now
    pub fn rescan(&self) -> Result<ImageSet, CatalogError> {
        match load_from(&self.source, &self.extensions) {
            Ok(ViewResult::Images(images)) => Ok(images),
            Ok(ViewResult::NothingToShow) => Ok(ImageSet::default()),
            Err(CatalogError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                // Explicit file lists lose members when files vanish
                Ok(self.existing_members())
            }
            Err(e) => Err(e),
        }
    }

    fn existing_members(&self) -> ImageSet {
        self.all.iter().filter(|path| path.is_file()).cloned().collect()
    }

    /// Bring `all` in line with a fresh listing
    ///
    /// Returns `None` when nothing was added or removed. In grid mode the view
    /// follows the new listing; filtered and single modes keep their context
    /// and only lose the paths that disappeared.
    pub fn reconcile(&mut self, listing: ImageSet) -> Option<ChangeSet> {
        let changes = ChangeSet {
            added: listing.difference(&self.all),
            removed: self.all.difference(&listing),
        };
        if changes.is_empty() {
            return None;
        }

        self.all = listing;
        match self.mode {
            ViewMode::Grid => {
                self.view = self.all.clone();
                self.selected.clear();
            }
            ViewMode::Filtered(_) | ViewMode::Single => {
                let current = self.current().map(Path::to_path_buf);
                let removed: HashSet<&PathBuf> = changes.removed.iter().collect();
                self.view.retain(|path| !removed.contains(path));
                self.selected.retain(|path| !removed.contains(path));
                self.restore_current(current.as_deref());
            }
        }

        tracing::info!(
            "🔄 folder changed: {} added, {} removed",
            changes.added.len(),
            changes.removed.len()
        );
        Some(changes)
    }
}

fn validate_name(name: &str) -> Result<(), CatalogError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed != name;
    if invalid {
        Err(CatalogError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}
