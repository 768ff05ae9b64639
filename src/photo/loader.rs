/// Pixel loading for the scoring network
///
/// Decodes a JPEG from disk and squeezes it to the network's fixed input size.
/// Aspect ratio is not preserved.

use image::{imageops::FilterType, ImageFormat, RgbImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Decode an image file to 8-bit RGB
pub fn load_rgb(path: &Path) -> Result<RgbImage, PhotoError> {
    let file = File::open(path).map_err(|source| PhotoError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let img = image::load(BufReader::new(file), ImageFormat::Jpeg).map_err(|source| {
        PhotoError::Decode {
            path: path.display().to_string(),
            source,
        }
    })?;

    Ok(img.to_rgb8())
}

/// Decode and resize to exactly `width` x `height` (bicubic)
pub fn load_for_model(path: &Path, width: u32, height: u32) -> Result<RgbImage, PhotoError> {
    let rgb = load_rgb(path)?;
    tracing::debug!(
        path = %path.display(),
        "decoded {}x{}, resizing to {}x{}",
        rgb.width(),
        rgb.height(),
        width,
        height
    );
    Ok(image::imageops::resize(&rgb, width, height, FilterType::CatmullRom))
}
