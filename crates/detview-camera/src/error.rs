use crate::{Backend, DeviceRef};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("{device} unavailable (tried backends: {})", join_backends(.tried))]
    DeviceUnavailable { device: DeviceRef, tried: Vec<Backend> },
    #[error("{0} is already in use by another worker")]
    DeviceBusy(DeviceRef),
    #[error("failed to read frame from {device}: {reason}")]
    ReadFailure { device: DeviceRef, reason: String },
    #[error("backend {backend} cannot open {device}")]
    UnsupportedBackend { device: DeviceRef, backend: Backend },
    #[error("capture pipeline error: {0}")]
    Pipeline(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CameraError>;

fn join_backends(tried: &[Backend]) -> String {
    if tried.is_empty() {
        return "none".to_string();
    }
    tried.iter().map(Backend::name).collect::<Vec<_>>().join(", ")
}
