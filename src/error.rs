/// Crate-wide error type
///
/// Each module keeps its own error enum; this one only gathers them for
/// callers that mix operations (the library facade, the command line).

use thiserror::Error;

use crate::config::ConfigError;
use crate::inference::AnalysisError;
use crate::metadata::CodecError;
use crate::photo::PhotoError;
use crate::state::CatalogError;
use crate::watcher::WatchError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Star rating must be between 1 and 5, got {0}")]
    InvalidStars(u8),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Photo(#[from] PhotoError),
}

pub type Result<T> = std::result::Result<T, Error>;
