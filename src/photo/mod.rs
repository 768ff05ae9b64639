/// Photo access module
///
/// This module handles:
/// - Decoding JPEGs and resizing them to the network input (loader.rs)
/// - Collecting what the details panel shows for one image (details.rs)

pub mod details;
pub mod loader;

pub use details::ImageDetails;
pub use loader::{load_for_model, PhotoError};
