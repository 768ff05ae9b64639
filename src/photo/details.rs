/// Everything the details panel shows for a single image
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::metadata::{stars_glyph, CodecError, Comments, RecordStore};

#[derive(Debug, Clone, PartialEq)]
pub struct ImageDetails {
    pub path: PathBuf,
    /// File name only (e.g., "IMG_0001.jpg")
    pub name: String,
    /// File creation date, falling back to modification date (dd-mm-yyyy)
    pub date: Option<String>,
    pub stars: Option<u8>,
    /// Overall score as a whole percentage, `None` until analysed
    pub score: Option<i32>,
    pub comments: Comments,
}

impl ImageDetails {
    pub fn load(path: &Path, store: &dyn RecordStore) -> Result<Self, CodecError> {
        let record = store.read_record(path)?;

        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let date = fs::metadata(path)
            .ok()
            .and_then(|m| m.created().or_else(|_| m.modified()).ok())
            .map(|time| DateTime::<Local>::from(time).format("%d-%m-%Y").to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            date,
            stars: record.stars,
            score: record.verdict.as_ref().map(|v| v.display_score()),
            comments: record
                .verdict
                .as_ref()
                .map(Comments::from_verdict)
                .unwrap_or_default(),
        })
    }

    pub fn stars_glyph(&self) -> String {
        stars_glyph(self.stars)
    }
}
