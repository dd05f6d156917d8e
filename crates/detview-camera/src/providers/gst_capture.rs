//! GStreamer provider: `<source> ! videoconvert ! RGB appsink`.

use crate::{Backend, CameraError, CaptureConfig, CaptureProvider, DeviceRef, Frame, FrameRead, FrameSource, Result};
use gst::prelude::*;
use std::time::Duration;

// how long a read may block before the device is treated as failed
const PULL_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Default)]
pub struct GstProvider;

impl GstProvider {
    pub fn new() -> Self {
        Self
    }
}

fn pipeline_err(e: impl std::fmt::Display) -> CameraError {
    CameraError::Pipeline(e.to_string())
}

/// Source element description for `device` on `backend`, or `None` if the
/// combination makes no sense.
fn source_element(device: &DeviceRef, backend: Backend) -> Option<String> {
    match (device, backend) {
        (DeviceRef::Index(i), Backend::V4l2) => Some(format!("v4l2src device=/dev/video{i}")),
        (DeviceRef::Index(i), Backend::AvFoundation) => Some(format!("avfvideosrc device-index={i}")),
        (DeviceRef::Index(i), Backend::MediaFoundation) => Some(format!("mfvideosrc device-index={i}")),
        (DeviceRef::Index(0), Backend::Any | Backend::GStreamer) => Some("autovideosrc".into()),
        (DeviceRef::Path(p), Backend::Any | Backend::GStreamer) => {
            Some(format!("filesrc location=\"{}\" ! decodebin", p.display()))
        }
        (DeviceRef::Uri(u), Backend::Any | Backend::GStreamer) => Some(format!("uridecodebin uri=\"{u}\"")),
        _ => None,
    }
}

fn pipeline_description(device: &DeviceRef, source: &str, config: &CaptureConfig) -> String {
    if device.is_camera() {
        format!(
            "{source} ! videoconvert ! videoscale ! video/x-raw,format=RGB,width={w},height={h} \
             ! appsink name=sink sync=false max-buffers=2 drop=true",
            w = config.width(),
            h = config.height()
        )
    } else {
        // files keep every frame so nothing is skipped
        format!("{source} ! videoconvert ! video/x-raw,format=RGB ! appsink name=sink sync=false")
    }
}

impl CaptureProvider for GstProvider {
    fn name(&self) -> &str {
        "gstreamer"
    }

    fn backends(&self) -> Vec<Backend> {
        let mut backends = Backend::platform_preference();
        backends.insert(backends.len() - 1, Backend::GStreamer);
        backends
    }

    fn open_with(&self, device: &DeviceRef, backend: Backend, config: &CaptureConfig) -> Result<Box<dyn FrameSource>> {
        gst::init().map_err(pipeline_err)?;
        let source = source_element(device, backend)
            .ok_or_else(|| CameraError::UnsupportedBackend { device: device.clone(), backend })?;
        let description = pipeline_description(device, &source, config);
        log::debug!("gstreamer: launching `{description}`");

        let pipeline = gst::parse::launch(&description)
            .map_err(pipeline_err)?
            .downcast::<gst::Pipeline>()
            .map_err(|_| CameraError::Pipeline("not a pipeline".into()))?;
        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Pipeline("appsink not found".into()))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| CameraError::Pipeline("appsink downcast failed".into()))?;

        let source = GstSource { device: device.clone(), backend, pipeline, appsink, seq: 0 };
        source.pipeline.set_state(gst::State::Playing).map_err(pipeline_err)?;
        // wait for preroll so a missing device fails here instead of on first read
        let (result, _, _) = source.pipeline.state(gst::ClockTime::from_seconds(PULL_TIMEOUT_SECS));
        result.map_err(|_| CameraError::DeviceUnavailable { device: device.clone(), tried: vec![backend] })?;
        Ok(Box::new(source))
    }
}

struct GstSource {
    device: DeviceRef,
    backend: Backend,
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    seq: u64,
}

impl GstSource {
    fn read_failure(&self, reason: impl Into<String>) -> CameraError {
        CameraError::ReadFailure { device: self.device.clone(), reason: reason.into() }
    }

    fn sample_to_frame(&self, sample: gst::Sample) -> Result<Frame> {
        let buffer = sample.buffer().ok_or_else(|| self.read_failure("sample has no buffer"))?;
        let caps = sample.caps().ok_or_else(|| self.read_failure("sample has no caps"))?;
        let s = caps.structure(0).ok_or_else(|| self.read_failure("caps missing structure"))?;
        let width = s.get::<i32>("width").map_err(|e| self.read_failure(e.to_string()))? as usize;
        let height = s.get::<i32>("height").map_err(|e| self.read_failure(e.to_string()))? as usize;
        let pts = buffer.pts().map(|t| Duration::from_nanos(t.nseconds())).unwrap_or(Duration::ZERO);

        let map = buffer.map_readable().map_err(|e| self.read_failure(e.to_string()))?;
        let data = map.as_slice();
        if height == 0 || data.len() < width * height * 3 {
            return Err(CameraError::InvalidFrame(format!("{width}x{height} RGB buffer of {} bytes", data.len())));
        }
        // RGB rows are padded to a multiple of four bytes
        let stride = data.len() / height;
        let row = width * 3;
        let mut rgb = Vec::with_capacity(row * height);
        for y in 0..height {
            rgb.extend_from_slice(&data[y * stride..y * stride + row]);
        }
        drop(map);
        Frame::from_rgb(self.seq, pts, width as u32, height as u32, rgb)
    }
}

impl FrameSource for GstSource {
    fn device(&self) -> &DeviceRef {
        &self.device
    }

    fn backend(&self) -> Backend {
        self.backend
    }

    fn read_frame(&mut self) -> Result<FrameRead> {
        match self.appsink.try_pull_sample(gst::ClockTime::from_seconds(PULL_TIMEOUT_SECS)) {
            Some(sample) => {
                let frame = self.sample_to_frame(sample)?;
                self.seq += 1;
                Ok(FrameRead::Frame(frame))
            }
            None if self.appsink.is_eos() && !self.device.is_camera() => Ok(FrameRead::EndOfStream),
            None => Err(self.read_failure("no sample before timeout")),
        }
    }

    fn close(self: Box<Self>) {
        // Drop sets the pipeline to Null
    }
}

impl Drop for GstSource {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn picks_source_elements_per_backend() {
        assert_eq!(
            source_element(&DeviceRef::Index(2), Backend::V4l2).as_deref(),
            Some("v4l2src device=/dev/video2")
        );
        assert!(source_element(&DeviceRef::Index(1), Backend::DirectShow).is_none());
        let file = source_element(&DeviceRef::Path(PathBuf::from("clip.mp4")), Backend::Any).unwrap();
        assert!(file.starts_with("filesrc"));
    }

    #[test]
    fn file_pipelines_never_drop_frames() {
        let device = DeviceRef::Path(PathBuf::from("clip.mp4"));
        let desc = pipeline_description(&device, "filesrc location=clip.mp4 ! decodebin", &CaptureConfig::default());
        assert!(!desc.contains("drop=true"));
        let cam = pipeline_description(&DeviceRef::Index(0), "autovideosrc", &CaptureConfig::default());
        assert!(cam.contains("drop=true"));
    }
}
