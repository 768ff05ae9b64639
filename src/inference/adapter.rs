/// Analysis of one or many photos
///
/// Each analysis loads the pixels, asks the scorer for its outputs, builds the
/// full record in memory and only then writes it. A scorer failure or an
/// incomplete output set never reaches the file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::scorer::{AestheticScorer, ModelOutput};
use super::AnalysisError;
use crate::metadata::{Attribute, RatingRecord, RecordStore, Verdict, record::SCORE_KEY};
use crate::photo;
use crate::watcher::SelfWriteGuard;

/// Cooperative cancellation, checked before each batch item
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Batch progress, reported before each item and once at the end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// Outcome of a batch: successes and failures are both kept
#[derive(Debug, Default)]
pub struct BatchReport {
    pub analysed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, AnalysisError)>,
    /// Items never started because the batch was cancelled
    pub skipped: Vec<PathBuf>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

/// Runs the scorer and persists its verdict
pub struct Analyzer<'a> {
    scorer: &'a dyn AestheticScorer,
    store: &'a dyn RecordStore,
    guard: Option<&'a SelfWriteGuard>,
}

impl<'a> Analyzer<'a> {
    pub fn new(scorer: &'a dyn AestheticScorer, store: &'a dyn RecordStore) -> Self {
        Self { scorer, store, guard: None }
    }

    /// Announce every write to the folder watcher
    pub fn with_guard(mut self, guard: &'a SelfWriteGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Analyse one photo and store the verdict in its tag block
    ///
    /// Returns the path of the analysed file for chaining.
    pub fn analyse(&self, path: &Path) -> Result<PathBuf, AnalysisError> {
        let (width, height) = self.scorer.input_size();
        let pixels = photo::load_for_model(path, width, height)?;

        let output = self.scorer.score(&pixels)?;
        let verdict = verdict_from_output(&output)?;
        let record = RatingRecord::from_verdict(verdict);

        let _ticket = self.guard.map(SelfWriteGuard::begin);
        self.store.write_record(path, &record)?;

        tracing::info!(
            path = %path.display(),
            stars = ?record.stars,
            percent = ?record.percent,
            "✅ analysed"
        );
        Ok(path.to_path_buf())
    }

    /// Analyse paths in order, continuing past failures
    ///
    /// `cancel` is checked before each item; an item already started always
    /// finishes, so no write is ever cut short.
    pub fn analyse_batch<F>(&self, paths: &[PathBuf], cancel: &CancelToken, mut progress: F) -> BatchReport
    where
        F: FnMut(Progress),
    {
        let total = paths.len();
        let mut report = BatchReport::default();

        for (done, path) in paths.iter().enumerate() {
            progress(Progress { done, total });

            if cancel.is_cancelled() {
                tracing::info!("batch cancelled after {} of {} images", done, total);
                report.cancelled = true;
                report.skipped.extend(paths[done..].iter().cloned());
                break;
            }

            match self.analyse(path) {
                Ok(analysed) => report.analysed.push(analysed),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "⚠️  analysis failed");
                    report.failed.push((path.clone(), e));
                }
            }
        }

        if !report.cancelled {
            progress(Progress { done: total, total });
        }

        tracing::info!(
            "📊 batch summary: {} analysed, {} failed, {} skipped",
            report.analysed.len(),
            report.failed.len(),
            report.skipped.len()
        );
        report
    }
}

/// Require every attribute plus the overall score, all finite
pub fn verdict_from_output(output: &ModelOutput) -> Result<Verdict, AnalysisError> {
    let keys = Attribute::ALL.iter().map(|a| a.key()).chain(std::iter::once(SCORE_KEY));
    for key in keys {
        match output.get(key) {
            None => return Err(AnalysisError::IncompleteOutput(key.to_string())),
            Some(value) if !value.is_finite() => {
                return Err(AnalysisError::InvalidOutput {
                    key: key.to_string(),
                    value: *value,
                })
            }
            Some(_) => {}
        }
    }

    Verdict::from_lookup(|key| output.get(key).copied())
        .ok_or_else(|| AnalysisError::IncompleteOutput(SCORE_KEY.to_string()))
}
