use detview_camera::DeviceRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("{0} already has an active worker")]
    AlreadyActive(DeviceRef),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
