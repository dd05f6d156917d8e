//! # detview-train
//!
//! Thin wrapper around the ultralytics `yolo` CLI: train a detector on a
//! dataset YAML, copy the best weights to a stable name and export them to
//! ONNX so the viewer can load them with Tract.
//!
//! ## Outputs
//!
//! - `<save_dir>/runs/train/` – the ultralytics run directory
//! - `<save_dir>/trained_model.pt` – best weights of the run
//! - `<save_dir>/trained_model.onnx` – unless ONNX export is disabled

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;

pub mod export;
pub mod train;

pub use export::{export_args, OnnxExporter};
pub use train::{find_trained_weights, train_args, Trainer};

/// File name the best weights are copied to.
pub const TRAINED_WEIGHTS: &str = "trained_model.pt";

/// Configuration for one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Dataset description (ultralytics data YAML)
    pub data_yaml: PathBuf,
    pub epochs: u32,
    /// Square training image size
    pub imgsz: u32,
    /// Where the run directory and the final weights go
    pub save_dir: PathBuf,
    /// Base weights to fine-tune from
    pub base_model: String,
    /// `cpu`, `0`, `0,1`, ... ; ultralytics picks when unset
    pub device: Option<String>,
    pub export_onnx: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_yaml: PathBuf::from("data.yaml"),
            epochs: 100,
            imgsz: 640,
            save_dir: PathBuf::from("./models"),
            base_model: "yolov8n.pt".to_string(),
            device: None,
            export_onnx: true,
        }
    }
}

impl TrainConfig {
    /// Ultralytics run directory for this config.
    pub fn run_dir(&self) -> PathBuf {
        self.save_dir.join("runs").join("train")
    }

    pub fn trained_weights(&self) -> PathBuf {
        self.save_dir.join(TRAINED_WEIGHTS)
    }
}

/// Files produced by a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainResult {
    pub weights: PathBuf,
    pub onnx: Option<PathBuf>,
}

/// Utility function to check if ultralytics CLI is available
pub async fn check_ultralytics_available() -> Result<bool> {
    check_program_available("yolo").await
}

pub(crate) async fn check_program_available(program: &str) -> Result<bool> {
    let output = Command::new(program).arg("--help").output().await;
    match output {
        Ok(output) => Ok(output.status.success()),
        Err(_) => Ok(false),
    }
}

pub(crate) fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
