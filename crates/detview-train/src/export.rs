//! ONNX export through `yolo export`.

use crate::display;
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

pub fn export_args(weights: &Path, imgsz: u32) -> Vec<String> {
    vec![
        "export".to_string(),
        format!("model={}", display(weights)),
        "format=onnx".to_string(),
        format!("imgsz={imgsz}"),
        "simplify=True".to_string(),
    ]
}

/// Exports `.pt` weights next to themselves as `.onnx`
pub struct OnnxExporter<'a> {
    program: &'a str,
    imgsz: u32,
}

impl<'a> OnnxExporter<'a> {
    pub fn new(program: &'a str, imgsz: u32) -> Self {
        Self { program, imgsz }
    }

    pub async fn export(&self, weights: &Path) -> Result<PathBuf> {
        log::info!("exporting {} to ONNX ({}x{})", weights.display(), self.imgsz, self.imgsz);
        let output = Command::new(self.program)
            .args(export_args(weights, self.imgsz))
            .output()
            .await
            .context("Failed to execute yolo export command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("YOLO export failed: {}", stderr.trim());
        }
        find_exported_model(weights)
    }
}

/// Ultralytics writes `<stem>.onnx` beside the weights; older versions put it
/// in a `runs/export/*` directory instead.
pub(crate) fn find_exported_model(weights: &Path) -> Result<PathBuf> {
    let beside = weights.with_extension("onnx");
    if beside.is_file() {
        return Ok(beside);
    }

    let name = beside.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let dir = weights.parent().unwrap_or(Path::new("."));
    let pattern = dir.join("runs/export/*").join(&name);
    for path in glob::glob(&pattern.to_string_lossy())?.flatten() {
        if path.is_file() {
            return Ok(path);
        }
    }

    Err(anyhow!("Could not find exported {name} next to {}", weights.display()))
}
