/// Record storage backed by the image file's own EXIF block
///
/// There is no database: the tag block *is* the store. `RecordStore` keeps the
/// rest of the crate independent of which container holds the fields.

use little_exif::metadata::Metadata;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::exif;
use super::record::RatingRecord;

/// File name prefix of the temp sibling used for atomic rewrites
pub const TEMP_PREFIX: &str = ".aesthetic-";

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Metadata codec errors
///
/// On read, only real I/O problems end up here and a missing or malformed
/// tag block is reported as an unrated record. On write, a block that is
/// present but unparseable is an error.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported image container: {0}")]
    Unsupported(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file carries a tag block we cannot parse; writing would drop it
    #[error("Unreadable tag block in {0}, refusing to overwrite it")]
    ForeignTagBlock(PathBuf),

    #[error("Failed to encode verdict: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CodecError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            CodecError::NotFound(path.to_path_buf())
        } else {
            CodecError::Io { path: path.to_path_buf(), source }
        }
    }
}

/// Read/write access to the rating record of one image
pub trait RecordStore {
    fn read_record(&self, path: &Path) -> Result<RatingRecord, CodecError>;

    /// Overwrite the fields present in `record`; fields left `None` keep their stored value
    fn write_record(&self, path: &Path, record: &RatingRecord) -> Result<(), CodecError>;
}

/// EXIF-backed store for JPEG files
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifStore;

impl ExifStore {
    pub fn new() -> Self {
        Self
    }

    /// Load the tag block, `None` when the file has none or it cannot be parsed
    fn load_metadata(path: &Path) -> Option<Metadata> {
        match Metadata::new_from_path(path) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no usable tag block");
                None
            }
        }
    }

    /// Load the tag block a write will be based on
    ///
    /// An empty block is only acceptable when the file has no Exif segment,
    /// or one whose IFD0 really is empty.
    fn load_for_write(path: &Path) -> Result<Metadata, CodecError> {
        let metadata = Self::load_metadata(path);
        let parsed_tags: usize = metadata
            .as_ref()
            .map(|m| m.get_ifds().iter().map(|ifd| ifd.get_tags().len()).sum())
            .unwrap_or(0);
        if parsed_tags > 0 {
            return Ok(metadata.unwrap_or_else(Metadata::new));
        }

        let bytes = fs::read(path).map_err(|e| CodecError::io(path, e))?;
        match exif::jpeg_exif_payload(&bytes) {
            Some(payload) if exif::ifd0_entry_count(payload) != Some(0) => {
                tracing::warn!(path = %path.display(), "⚠️  unparseable tag block left untouched");
                Err(CodecError::ForeignTagBlock(path.to_path_buf()))
            }
            _ => Ok(metadata.unwrap_or_else(Metadata::new)),
        }
    }
}

impl RecordStore for ExifStore {
    fn read_record(&self, path: &Path) -> Result<RatingRecord, CodecError> {
        check_container(path)?;

        Ok(Self::load_metadata(path)
            .map(|metadata| exif::record_from_metadata(&metadata))
            .unwrap_or_default())
    }

    fn write_record(&self, path: &Path, record: &RatingRecord) -> Result<(), CodecError> {
        check_container(path)?;

        let mut metadata = Self::load_for_write(path)?;
        exif::apply_record(&mut metadata, record)?;

        // Work on a copy next to the original, then swap it in with a rename.
        // A failure anywhere before the rename leaves the original untouched.
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let suffix = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| CodecError::io(dir, e))?;

        fs::copy(path, temp.path()).map_err(|e| CodecError::io(path, e))?;
        metadata
            .write_to_file(temp.path())
            .map_err(|e| CodecError::io(temp.path(), e))?;
        temp.persist(path).map_err(|e| CodecError::io(path, e.error))?;

        tracing::debug!(
            path = %path.display(),
            stars = ?record.stars,
            percent = ?record.percent,
            "rating record written"
        );
        Ok(())
    }
}

/// True when the extension is in the allow-list (case-insensitive)
pub fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)))
        .unwrap_or(false)
}

/// Confirm the file exists and starts like a JPEG
fn check_container(path: &Path) -> Result<(), CodecError> {
    let mut file = File::open(path).map_err(|e| CodecError::io(path, e))?;
    let mut magic = [0u8; 3];
    match file.read_exact(&mut magic) {
        Ok(()) if magic == JPEG_MAGIC => Ok(()),
        Ok(()) => Err(CodecError::Unsupported(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(CodecError::Unsupported(path.to_path_buf()))
        }
        Err(e) => Err(CodecError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::record::{Attribute, Verdict};
    use little_exif::exif_tag::ExifTag;
    use tempfile::TempDir;

    fn write_jpeg(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(16, 16, image::Rgb([120, 80, 200]))
            .save(&path)
            .unwrap();
        path
    }

    fn analysed_record() -> RatingRecord {
        let mut verdict = Verdict::new([0.0; Attribute::COUNT], 0.42);
        verdict.set(Attribute::Light, 0.31);
        verdict.set(Attribute::MotionBlur, -0.44);
        RatingRecord::from_verdict(verdict)
    }

    fn camera_make(path: &Path) -> Option<String> {
        let metadata = Metadata::new_from_path(path).ok()?;
        metadata
            .get_tag(&ExifTag::Make(String::new()))
            .find_map(|tag| match tag {
                ExifTag::Make(make) => Some(make.trim_end_matches('\0').to_string()),
                _ => None,
            })
    }

    #[test]
    fn test_plain_jpeg_reads_as_unrated() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "plain.jpg");

        let record = ExifStore::new().read_record(&path).unwrap();
        assert!(record.is_unrated());
        assert_eq!(record.verdict, None);
    }

    #[test]
    fn test_round_trip_preserves_unrelated_tags() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "camera.jpg");

        let mut metadata = Metadata::new();
        metadata.set_tag(ExifTag::Make("TestCam".to_string()));
        metadata.write_to_file(&path).unwrap();

        let store = ExifStore::new();
        let record = analysed_record();
        store.write_record(&path, &record).unwrap();

        assert_eq!(store.read_record(&path).unwrap(), record);
        assert_eq!(camera_make(&path).as_deref(), Some("TestCam"));
        // Pixels still decode after the rewrite
        assert_eq!(image::open(&path).unwrap().width(), 16);
    }

    #[test]
    fn test_manual_edit_keeps_stored_verdict() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "edit.jpg");
        let store = ExifStore::new();

        let analysed = analysed_record();
        store.write_record(&path, &analysed).unwrap();
        store.write_record(&path, &RatingRecord::manual(5).unwrap()).unwrap();

        let record = store.read_record(&path).unwrap();
        assert_eq!(record.stars, Some(5));
        assert_eq!(record.percent, Some(95));
        assert_eq!(record.verdict, analysed.verdict);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "clean.jpg");
        ExifStore::new().write_record(&path, &analysed_record()).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["clean.jpg".to_string()]);
    }

    #[test]
    fn test_io_failures_surface() {
        let dir = TempDir::new().unwrap();
        let store = ExifStore::new();

        let missing = dir.path().join("missing.jpg");
        assert!(matches!(store.read_record(&missing), Err(CodecError::NotFound(_))));

        let text = dir.path().join("notes.jpg");
        fs::write(&text, "not an image").unwrap();
        assert!(matches!(store.read_record(&text), Err(CodecError::Unsupported(_))));
        assert!(matches!(
            store.write_record(&text, &analysed_record()),
            Err(CodecError::Unsupported(_))
        ));
        assert_eq!(fs::read_to_string(&text).unwrap(), "not an image");
    }

    #[test]
    fn test_unparseable_tag_block_is_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let plain = write_jpeg(dir.path(), "plain.jpg");
        let encoded = fs::read(&plain).unwrap();

        // APP1 Exif segment whose IFD0 offset points past the end of the block
        let tiff = [b'I', b'I', 42, 0, 0x00, 0xF0, 0x00, 0x00, 1, 2, 3, 4, 5, 6, 7, 8];
        let mut bytes = encoded[..2].to_vec();
        bytes.extend_from_slice(&[0xFF, 0xE1]);
        bytes.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        bytes.extend_from_slice(b"Exif\0\0");
        bytes.extend_from_slice(&tiff);
        bytes.extend_from_slice(&encoded[2..]);
        let path = dir.path().join("foreign.jpg");
        fs::write(&path, &bytes).unwrap();

        let store = ExifStore::new();
        assert!(store.read_record(&path).unwrap().is_unrated());
        assert!(matches!(
            store.write_record(&path, &analysed_record()),
            Err(CodecError::ForeignTagBlock(_))
        ));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_extension_allow_list() {
        let allowed = vec!["jpg".to_string(), "jpeg".to_string()];
        assert!(has_allowed_extension(Path::new("a/B.JPG"), &allowed));
        assert!(has_allowed_extension(Path::new("c.jpeg"), &allowed));
        assert!(!has_allowed_extension(Path::new("d.png"), &allowed));
        assert!(!has_allowed_extension(Path::new("noext"), &allowed));
    }
}
