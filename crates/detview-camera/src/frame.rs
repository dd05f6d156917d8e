use crate::{CameraError, Result};
use image::RgbImage;
use std::sync::Arc;
use std::time::Duration;

/// One decoded RGB8 image from a capture source.
///
/// Pixels sit behind an `Arc` and there is no mutable accessor, so a frame
/// handed to the UI can be shared freely and never changes afterwards.
#[derive(Debug, Clone)]
pub struct Frame {
    seq: u64,
    pts: Duration,
    pixels: Arc<RgbImage>,
}

impl Frame {
    pub fn new(seq: u64, pts: Duration, pixels: RgbImage) -> Self {
        Self { seq, pts, pixels: Arc::new(pixels) }
    }

    /// Build a frame from tightly packed RGB bytes.
    pub fn from_rgb(seq: u64, pts: Duration, width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CameraError::InvalidFrame(format!(
                "{width}x{height} RGB needs {expected} bytes, got {}",
                data.len()
            )));
        }
        let pixels = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| CameraError::InvalidFrame("buffer rejected by image".into()))?;
        Ok(Self::new(seq, pts, pixels))
    }

    /// A new image that belongs to the same capture instant as `self`
    /// (used for the annotated copy of a frame).
    pub fn derive(&self, pixels: RgbImage) -> Self {
        Self::new(self.seq, self.pts, pixels)
    }

    /// Capture order within one source, starting at 0.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn pts(&self) -> Duration {
        self.pts
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn channels(&self) -> u8 {
        3
    }

    pub fn image(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn shared_image(&self) -> Arc<RgbImage> {
        Arc::clone(&self.pixels)
    }
}

/// Result of a successful read.
#[derive(Debug, Clone)]
pub enum FrameRead {
    Frame(Frame),
    EndOfStream,
}
