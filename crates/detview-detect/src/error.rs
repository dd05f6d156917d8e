use std::path::PathBuf;
use thiserror::Error;
use tract_onnx::prelude::TractError;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to load model {}: {reason}", .path.display())]
    ModelLoad { path: PathBuf, reason: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid output shape: expected [1, 4 + classes, anchors], got {0:?}")]
    InvalidOutputShape(Vec<usize>),
}

impl From<TractError> for DetectError {
    fn from(e: TractError) -> Self {
        DetectError::Inference(format!("{e:#}"))
    }
}

pub type Result<T> = std::result::Result<T, DetectError>;
