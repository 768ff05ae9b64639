/// Inference adapter module
///
/// - The scorer trait and the ONNX session behind it (scorer.rs)
/// - Single and batch analysis that persists verdicts (adapter.rs)

pub mod adapter;
pub mod scorer;

use std::path::PathBuf;
use thiserror::Error;

use crate::metadata::CodecError;
use crate::photo::PhotoError;

pub use adapter::{Analyzer, BatchReport, CancelToken, Progress};
pub use scorer::{AestheticScorer, ModelOutput, OnnxScorer};

/// Analysis errors; any of these aborts the item before its record is written
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("No model configured (set model_path or pass --model)")]
    ModelNotConfigured,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Model output is missing {0}")]
    IncompleteOutput(String),

    #[error("Model output {key} is not a finite number: {value}")]
    InvalidOutput { key: String, value: f32 },

    #[error(transparent)]
    Photo(#[from] PhotoError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
