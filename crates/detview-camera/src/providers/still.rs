//! Still images as a frame source.
//!
//! A single image file yields one frame then end of stream. A directory
//! yields every image inside it in file-name order, which is enough to
//! replay an extracted frame sequence without any native decoder.

use crate::{Backend, CameraError, CaptureConfig, CaptureProvider, DeviceRef, Frame, FrameRead, FrameSource, Result};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StillImageProvider;

impl StillImageProvider {
    pub fn new() -> Self {
        Self
    }

    fn collect(path: &Path) -> Result<VecDeque<PathBuf>> {
        if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image_path(p))
                .collect();
            files.sort();
            if files.is_empty() {
                return Err(io::Error::new(io::ErrorKind::NotFound, "directory holds no images").into());
            }
            return Ok(files.into());
        }
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())).into());
        }
        Ok(VecDeque::from([path.to_path_buf()]))
    }
}

impl CaptureProvider for StillImageProvider {
    fn name(&self) -> &str {
        "still-image"
    }

    fn backends(&self) -> Vec<Backend> {
        vec![Backend::Any]
    }

    fn accepts(&self, device: &DeviceRef) -> bool {
        match device {
            DeviceRef::Path(p) => p.is_dir() || is_image_path(p),
            _ => false,
        }
    }

    fn open_with(&self, device: &DeviceRef, backend: Backend, _config: &CaptureConfig) -> Result<Box<dyn FrameSource>> {
        let path = match (device, backend) {
            (DeviceRef::Path(p), Backend::Any) => p,
            _ => {
                return Err(CameraError::UnsupportedBackend { device: device.clone(), backend });
            }
        };
        let files = Self::collect(path)?;
        log::debug!("still-image: {} file(s) queued from {}", files.len(), path.display());
        Ok(Box::new(StillImageSource {
            device: device.clone(),
            files,
            seq: 0,
            opened: Instant::now(),
        }))
    }
}

struct StillImageSource {
    device: DeviceRef,
    files: VecDeque<PathBuf>,
    seq: u64,
    opened: Instant,
}

impl FrameSource for StillImageSource {
    fn device(&self) -> &DeviceRef {
        &self.device
    }

    fn backend(&self) -> Backend {
        Backend::Any
    }

    fn read_frame(&mut self) -> Result<FrameRead> {
        let Some(path) = self.files.pop_front() else {
            return Ok(FrameRead::EndOfStream);
        };
        let image = image::open(&path).map_err(|e| CameraError::ReadFailure {
            device: self.device.clone(),
            reason: format!("{}: {e}", path.display()),
        })?;
        let frame = Frame::new(self.seq, self.opened.elapsed(), image.to_rgb8());
        self.seq += 1;
        Ok(FrameRead::Frame(frame))
    }

    fn close(self: Box<Self>) {}
}
