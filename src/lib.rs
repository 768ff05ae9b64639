/// Aesthetic rating for photo folders
///
/// Scores JPEGs with an aesthetic network, stores the verdict inside each
/// file's EXIF block, and keeps a catalog of a folder in sync with disk.

pub mod config;
pub mod error;
pub mod inference;
pub mod metadata;
pub mod photo;
pub mod state;
pub mod watcher;

pub use config::Settings;
pub use error::{Error, Result};
