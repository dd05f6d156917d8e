//! detview – capture worker
//!
//! [`CaptureWorker`] owns one source on a dedicated thread: open with backend
//! fallback, read, infer, publish, close. The UI side never touches a device
//! or the model; it reads [`FramePair`]s out of a latest-wins slot and
//! [`WorkerEvent`]s out of an unbounded queue (see [`display_channel`]).
//!
//! [`Supervisor`] drives a single display and enforces switch semantics.
//! [`CameraManager`] runs one worker per device side by side.

mod error;
mod manager;
mod sink;
mod state;
mod supervisor;
mod worker;

pub use error::{Result, WorkerError};
pub use manager::CameraManager;
pub use sink::{display_channel, DisplayReceiver, DisplaySink, FramePair, Publisher, WorkerEvent};
pub use state::WorkerState;
pub use supervisor::Supervisor;
pub use worker::{CaptureWorker, WorkerSpec, LEASE_WAIT};
