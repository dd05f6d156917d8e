use anyhow::{Context, Result};
use detview_camera::{CaptureConfig, DEFAULT_PROBE_LIMIT};
use detview_detect::{DEFAULT_CONFIDENCE, DEFAULT_INPUT_SIZE, DEFAULT_IOU};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Viewer settings, loaded from JSON. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub model: PathBuf,
    /// Models the viewer can switch between at runtime.
    pub models: Vec<PathBuf>,
    pub input_size: u32,
    pub confidence: f32,
    pub iou: f32,
    pub probe_limit: u32,
    pub capture: CaptureConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/yolov8n.onnx"),
            models: Vec::new(),
            input_size: DEFAULT_INPUT_SIZE,
            confidence: DEFAULT_CONFIDENCE,
            iou: DEFAULT_IOU,
            probe_limit: DEFAULT_PROBE_LIMIT,
            capture: CaptureConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Defaults when `path` is `None`.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }
}
