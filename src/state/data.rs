/// Shared data structures for the catalog and the views built on it
///
/// Paths are the only identity an image has. Sets are ordered for display,
/// but every lookup is by path, never by position.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where the catalog's images come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Every image directly inside a folder (non-recursive)
    Folder(PathBuf),
    /// An explicit list of files
    Files(Vec<PathBuf>),
}

impl Source {
    /// The folder to watch, if any
    pub fn folder(&self) -> Option<&Path> {
        match self {
            Source::Folder(folder) => Some(folder),
            Source::Files(_) => None,
        }
    }
}

/// Ordered list of image paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet(Vec<PathBuf>);

impl ImageSet {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.0.iter()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.iter().any(|p| p == path)
    }

    pub fn position(&self, path: &Path) -> Option<usize> {
        self.0.iter().position(|p| p == path)
    }

    /// Swap `old` for `new` in place, keeping its position
    pub fn replace(&mut self, old: &Path, new: &Path) -> bool {
        match self.position(old) {
            Some(index) => {
                self.0[index] = new.to_path_buf();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.0.len();
        self.0.retain(|p| p != path);
        self.0.len() != before
    }

    /// Keep only paths for which `keep` holds, preserving order
    pub fn retain<F: FnMut(&PathBuf) -> bool>(&mut self, keep: F) {
        self.0.retain(keep);
    }

    /// Paths of `self` missing from `other`, in `self`'s order
    pub fn difference(&self, other: &ImageSet) -> Vec<PathBuf> {
        let other: HashSet<&PathBuf> = other.0.iter().collect();
        self.0.iter().filter(|p| !other.contains(p)).cloned().collect()
    }
}

impl FromIterator<PathBuf> for ImageSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ImageSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One image as the view shows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub selected: bool,
    /// Whether the entry is part of the current view (always true without a filter)
    pub filtered_in: bool,
}

/// Star filter chosen in the gallery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StarFilter {
    #[default]
    None,
    Stars(u8),
}

impl FromStr for StarFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("no filter") {
            return Ok(StarFilter::None);
        }
        match s.parse::<u8>() {
            Ok(stars @ 1..=5) => Ok(StarFilter::Stars(stars)),
            _ => Err(format!("expected 1-5 or \"none\", got {:?}", s)),
        }
    }
}

impl fmt::Display for StarFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StarFilter::None => write!(f, "No Filter"),
            StarFilter::Stars(stars) => write!(f, "{}", stars),
        }
    }
}

/// How the user is currently browsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Unfiltered grid of every image
    #[default]
    Grid,
    /// Grid restricted to one star rating
    Filtered(u8),
    /// One image at a time
    Single,
}

/// "Nothing to show" is a normal outcome, distinct from failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewResult<T> {
    Images(T),
    NothingToShow,
}

impl<T> ViewResult<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, ViewResult::NothingToShow)
    }
}

/// Paths that appeared or vanished since the last reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> ImageSet {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut images = set(&["a.jpg", "b.jpg", "c.jpg"]);
        assert!(images.replace(Path::new("b.jpg"), Path::new("z.jpg")));
        assert_eq!(images, set(&["a.jpg", "z.jpg", "c.jpg"]));
        assert!(!images.replace(Path::new("missing.jpg"), Path::new("y.jpg")));
    }

    #[test]
    fn test_difference_is_ordered() {
        let before = set(&["a.jpg", "b.jpg", "c.jpg"]);
        let after = set(&["c.jpg", "d.jpg", "a.jpg"]);
        assert_eq!(before.difference(&after), vec![PathBuf::from("b.jpg")]);
        assert_eq!(after.difference(&before), vec![PathBuf::from("d.jpg")]);
    }

    #[test]
    fn test_star_filter_parsing() {
        assert_eq!("No Filter".parse::<StarFilter>(), Ok(StarFilter::None));
        assert_eq!("none".parse::<StarFilter>(), Ok(StarFilter::None));
        assert_eq!(" 4 ".parse::<StarFilter>(), Ok(StarFilter::Stars(4)));
        assert!("0".parse::<StarFilter>().is_err());
        assert!("six".parse::<StarFilter>().is_err());
    }
}
