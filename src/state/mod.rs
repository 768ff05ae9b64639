/// State management module
///
/// This module handles the in-memory view of the active source:
/// - Shared data structures (data.rs)
/// - The catalog of images and its filtered/selected views (catalog.rs)
/// - The library facade that front ends call (library.rs)
/// - Recoverable deletion (trash.rs)

pub mod catalog;
pub mod data;
pub mod library;
pub mod trash;

pub use catalog::{filter_by_stars, load_from, Catalog, CatalogError};
pub use data::{CatalogEntry, ChangeSet, ImageSet, Source, StarFilter, ViewMode, ViewResult};
pub use library::Library;
pub use trash::{FolderTrash, SystemTrash, Trash};
