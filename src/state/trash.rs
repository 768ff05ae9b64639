/// Recoverable deletion
///
/// Images are never erased. They go to the desktop trash, or to a plain
/// folder when `trash_dir` is configured (network shares, headless machines).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait Trash {
    /// Move `path` somewhere it can be restored from
    fn discard(&self, path: &Path) -> io::Result<()>;
}

/// The platform trash (Recycle Bin, Finder trash, freedesktop trash)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTrash;

impl Trash for SystemTrash {
    fn discard(&self, path: &Path) -> io::Result<()> {
        trash::delete(path).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

/// A regular folder used as trash
#[derive(Debug, Clone)]
pub struct FolderTrash {
    dir: PathBuf,
}

impl FolderTrash {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// First free name in the trash folder: "a.jpg", "a (1).jpg", "a (2).jpg", ...
    fn free_destination(&self, path: &Path) -> io::Result<PathBuf> {
        let name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let candidate = self.dir.join(name);
        if !candidate.exists() {
            return Ok(candidate);
        }

        let stem = path.file_stem().unwrap_or_default().to_string_lossy();
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        (1..)
            .map(|n| self.dir.join(format!("{} ({}){}", stem, n, extension)))
            .find(|candidate| !candidate.exists())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no free name in trash folder"))
    }
}

impl Trash for FolderTrash {
    fn discard(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let destination = self.free_destination(path)?;

        if fs::rename(path, &destination).is_err() {
            // Different filesystem: copy, then remove the original
            fs::copy(path, &destination)?;
            fs::remove_file(path)?;
        }

        tracing::debug!(
            from = %path.display(),
            to = %destination.display(),
            "moved to trash folder"
        );
        Ok(())
    }
}
