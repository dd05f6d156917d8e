use serde::{Deserialize, Serialize};

/// Requested capture geometry. Providers treat it as a hint; the frames
/// they return carry their real size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    width: u32,
    height: u32,
    fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { width: 640, height: 480, fps: 30 }
    }
}

impl CaptureConfig {
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }
}
