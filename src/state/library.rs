use std::path::{Path, PathBuf};

use super::catalog::{Catalog, CatalogError};
use super::data::{ImageSet, Source, StarFilter, ViewMode, ViewResult};
use super::trash::{FolderTrash, SystemTrash, Trash};
use crate::config::Settings;
use crate::error::Error;
use crate::inference::{AestheticScorer, Analyzer, BatchReport, CancelToken, Progress};
use crate::metadata::{CodecError, ExifStore, RatingRecord, RecordStore};
use crate::photo::ImageDetails;
use crate::watcher::SelfWriteGuard;

/// The Library is what a front end talks to.
///
/// It owns the catalog of the active source and routes every operation
/// that touches files (analysis, rating edits, renames, deletes) through
/// the record store and the self-write guard, so the folder watcher can
/// tell our own writes from external changes.
pub struct Library {
    catalog: Catalog,
    store: Box<dyn RecordStore + Send>,
    trash: Box<dyn Trash + Send>,
    guard: SelfWriteGuard,
}

impl Library {
    /// Open a source with the EXIF store and the configured trash.
    pub fn open(source: Source, settings: &Settings) -> Result<ViewResult<Library>, CatalogError> {
        let catalog = match Catalog::open(source, settings.extensions.clone())? {
            ViewResult::Images(catalog) => catalog,
            ViewResult::NothingToShow => return Ok(ViewResult::NothingToShow),
        };

        let trash: Box<dyn Trash + Send> = match &settings.trash_dir {
            Some(dir) => Box::new(FolderTrash::new(dir)),
            None => Box::new(SystemTrash),
        };

        Ok(ViewResult::Images(Self::new(
            catalog,
            Box::new(ExifStore::new()),
            trash,
        )))
    }

    pub fn new(
        catalog: Catalog,
        store: Box<dyn RecordStore + Send>,
        trash: Box<dyn Trash + Send>,
    ) -> Self {
        Self {
            catalog,
            store,
            trash,
            guard: SelfWriteGuard::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Handle for the folder watcher
    pub fn guard(&self) -> &SelfWriteGuard {
        &self.guard
    }

    pub fn details(&self, path: &Path) -> Result<ImageDetails, CodecError> {
        ImageDetails::load(path, self.store.as_ref())
    }

    pub fn filter(&mut self, filter: StarFilter) -> ViewResult<&ImageSet> {
        self.catalog.apply_filter(filter, self.store.as_ref())
    }

    // ========== Analysis ==========

    fn analyzer<'a>(&'a self, scorer: &'a dyn AestheticScorer) -> Analyzer<'a> {
        Analyzer::new(scorer, self.store.as_ref()).with_guard(&self.guard)
    }

    /// Analyse every image in the current view
    pub fn analyse_shown<F>(&mut self, scorer: &dyn AestheticScorer, cancel: &CancelToken, progress: F) -> BatchReport
    where
        F: FnMut(Progress),
    {
        let paths = self.catalog.view().paths().to_vec();
        let report = self.analyzer(scorer).analyse_batch(&paths, cancel, progress);
        self.catalog.clear_selection();
        report
    }

    /// Analyse the selected images, then clear the selection
    pub fn analyse_selected<F>(&mut self, scorer: &dyn AestheticScorer, cancel: &CancelToken, progress: F) -> BatchReport
    where
        F: FnMut(Progress),
    {
        let paths = self.catalog.selected();
        let report = self.analyzer(scorer).analyse_batch(&paths, cancel, progress);
        self.catalog.clear_selection();
        report
    }

    /// Analyse the image open in single mode as a batch of one
    ///
    /// `None` outside single mode.
    pub fn analyse_current<F>(
        &mut self,
        scorer: &dyn AestheticScorer,
        cancel: &CancelToken,
        progress: F,
    ) -> Option<BatchReport>
    where
        F: FnMut(Progress),
    {
        let paths = vec![self.catalog.current()?.to_path_buf()];
        let report = self.analyzer(scorer).analyse_batch(&paths, cancel, progress);
        self.catalog.clear_selection();
        Some(report)
    }

    // ========== Edits ==========

    /// Apply a rename and/or a manual star rating
    ///
    /// The rename runs first; if the new name is taken nothing is written.
    /// Returns the path the image lives at afterwards.
    pub fn save_changes(&mut self, path: &Path, new_name: Option<&str>, stars: Option<u8>) -> Result<PathBuf, Error> {
        let record = match stars {
            Some(stars) => Some(RatingRecord::manual(stars).ok_or(Error::InvalidStars(stars))?),
            None => None,
        };

        let _ticket = self.guard.begin();

        let path = match new_name {
            Some(name) => self.catalog.rename(path, name)?,
            None => path.to_path_buf(),
        };

        if let Some(record) = record {
            self.store.write_record(&path, &record)?;
            tracing::info!(path = %path.display(), stars = ?record.stars, "⭐ rating saved");
        }

        Ok(path)
    }

    /// Move an image to the trash and go back to the unfiltered grid
    pub fn delete(&mut self, path: &Path) -> Result<(), CatalogError> {
        {
            let _ticket = self.guard.begin();
            self.catalog.delete(path, self.trash.as_ref())?;
        }
        self.catalog.show_grid();
        Ok(())
    }

    pub fn mode(&self) -> ViewMode {
        self.catalog.mode()
    }
}
