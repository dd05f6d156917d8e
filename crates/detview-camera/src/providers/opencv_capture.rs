//! OpenCV `VideoCapture` provider.
//!
//! Handles camera indices, local video files and stream URIs. Frames come
//! out of OpenCV as BGR and are swapped to RGB before they leave this module.

use crate::{Backend, CameraError, CaptureConfig, CaptureProvider, DeviceRef, Frame, FrameRead, FrameSource, Result};
use opencv::{
    core::{Mat, MatTraitConst, MatTraitConstManual},
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct OpenCvProvider {
    backends: Vec<Backend>,
}

impl OpenCvProvider {
    pub fn new() -> Self {
        Self { backends: Backend::platform_preference() }
    }

    /// Replace the backend preference list.
    pub fn with_backends(mut self, backends: Vec<Backend>) -> Self {
        self.backends = backends;
        self
    }
}

impl Default for OpenCvProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn api_preference(backend: Backend) -> i32 {
    match backend {
        Backend::MediaFoundation => videoio::CAP_MSMF,
        Backend::DirectShow => videoio::CAP_DSHOW,
        Backend::AvFoundation => videoio::CAP_AVFOUNDATION,
        Backend::V4l2 => videoio::CAP_V4L2,
        Backend::GStreamer => videoio::CAP_GSTREAMER,
        Backend::Any => videoio::CAP_ANY,
    }
}

fn pipeline_err(e: opencv::Error) -> CameraError {
    CameraError::Pipeline(e.to_string())
}

fn configure(cap: &mut VideoCapture, config: &CaptureConfig) {
    let _ = cap.set(videoio::CAP_PROP_FRAME_WIDTH, config.width() as f64);
    let _ = cap.set(videoio::CAP_PROP_FRAME_HEIGHT, config.height() as f64);
    let _ = cap.set(videoio::CAP_PROP_FPS, config.fps() as f64);
}

impl CaptureProvider for OpenCvProvider {
    fn name(&self) -> &str {
        "opencv"
    }

    fn backends(&self) -> Vec<Backend> {
        self.backends.clone()
    }

    fn open_with(&self, device: &DeviceRef, backend: Backend, config: &CaptureConfig) -> Result<Box<dyn FrameSource>> {
        let api = api_preference(backend);
        let mut cap = match device {
            DeviceRef::Index(i) => VideoCapture::new(*i as i32, api).map_err(pipeline_err)?,
            DeviceRef::Path(p) => VideoCapture::from_file(&p.to_string_lossy(), api).map_err(pipeline_err)?,
            DeviceRef::Uri(u) => VideoCapture::from_file(u, api).map_err(pipeline_err)?,
        };
        if !cap.is_opened().map_err(pipeline_err)? {
            return Err(CameraError::DeviceUnavailable { device: device.clone(), tried: vec![backend] });
        }
        if device.is_camera() {
            configure(&mut cap, config);
        }
        Ok(Box::new(OpenCvSource {
            device: device.clone(),
            backend,
            cap,
            mat: Mat::default(),
            seq: 0,
            opened: Instant::now(),
        }))
    }
}

struct OpenCvSource {
    device: DeviceRef,
    backend: Backend,
    cap: VideoCapture,
    mat: Mat,
    seq: u64,
    opened: Instant,
}

impl OpenCvSource {
    fn to_frame(&self) -> Result<Frame> {
        let size = self.mat.size().map_err(pipeline_err)?;
        let (w, h) = (size.width as u32, size.height as u32);
        let bgr = self.mat.data_bytes().map_err(pipeline_err)?;
        let mut rgb = Vec::with_capacity(bgr.len());
        for px in bgr.chunks_exact(3) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        Frame::from_rgb(self.seq, self.opened.elapsed(), w, h, rgb)
    }
}

impl FrameSource for OpenCvSource {
    fn device(&self) -> &DeviceRef {
        &self.device
    }

    fn backend(&self) -> Backend {
        self.backend
    }

    fn read_frame(&mut self) -> Result<FrameRead> {
        let ok = self.cap.read(&mut self.mat).map_err(|e| CameraError::ReadFailure {
            device: self.device.clone(),
            reason: e.to_string(),
        })?;
        let empty = self.mat.empty();
        if !ok || empty {
            // a camera never ends on its own
            if self.device.is_camera() {
                return Err(CameraError::ReadFailure {
                    device: self.device.clone(),
                    reason: "no frame returned".into(),
                });
            }
            return Ok(FrameRead::EndOfStream);
        }
        if self.mat.channels() != 3 || !self.mat.is_continuous() {
            return Err(CameraError::InvalidFrame(format!(
                "expected continuous 3-channel frame from {}",
                self.device
            )));
        }
        let frame = self.to_frame()?;
        self.seq += 1;
        Ok(FrameRead::Frame(frame))
    }

    fn close(mut self: Box<Self>) {
        if let Err(e) = self.cap.release() {
            log::warn!("opencv: release of {} failed: {e}", self.device);
        }
    }
}
