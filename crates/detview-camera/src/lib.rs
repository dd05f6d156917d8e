// detview-camera/src/lib.rs
// ============================================================
// Capture layer for detview
// Opens cameras, video files, streams and still images behind
// one FrameSource trait and hands out RGB8 frames.
// ------------------------------------------------------------
// Public API:
//   * CaptureProvider::open()      – backend preference + fallback
//   * CaptureProvider::enumerate() – probe camera indices
//   * FrameSource::read_frame()    – blocking read, EOS aware
//   * DeviceLeases                 – one owner per device
// ------------------------------------------------------------
// Build notes
//   * `opencv` and `gstreamer` features pull in system libs.
//     Without them only still images are available.
// ============================================================

//! detview – camera capture layer
//!
//! Every source, be it a webcam, a video file or a folder of images, is
//! opened through a [`CaptureProvider`] and read through a [`FrameSource`].
//! Providers try their backends in preference order and fall back to the
//! default one, so callers only see [`CameraError::DeviceUnavailable`] once
//! every backend has failed.

mod config;
mod device;
mod error;
mod frame;
mod lease;
mod probe;
mod source;

pub mod providers;

pub use config::CaptureConfig;
pub use device::{Backend, DeviceRef};
pub use error::{CameraError, Result};
pub use frame::{Frame, FrameRead};
pub use lease::{DeviceLease, DeviceLeases};
pub use probe::{probe_devices, DEFAULT_PROBE_LIMIT};
pub use source::{CaptureProvider, FrameSource};
