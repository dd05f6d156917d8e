//! Training through `yolo detect train`.

use crate::{display, OnnxExporter, TrainConfig, TrainResult};
use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Arguments for `yolo` that train `config`.
pub fn train_args(config: &TrainConfig) -> Vec<String> {
    let mut args = vec![
        "detect".to_string(),
        "train".to_string(),
        format!("data={}", display(&config.data_yaml)),
        format!("model={}", config.base_model),
        format!("epochs={}", config.epochs),
        format!("imgsz={}", config.imgsz),
        format!("project={}", display(&config.save_dir.join("runs"))),
        "name=train".to_string(),
        "exist_ok=True".to_string(),
    ];
    if let Some(device) = &config.device {
        args.push(format!("device={device}"));
    }
    args
}

/// Locate the weights a run produced: `best.pt`, then `last.pt`, then any
/// `best.pt` under a sibling run directory.
pub fn find_trained_weights(run_dir: &Path) -> Result<PathBuf> {
    let candidates = [run_dir.join("weights/best.pt"), run_dir.join("weights/last.pt")];
    for candidate in &candidates {
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }

    if let Some(runs) = run_dir.parent() {
        let pattern = runs.join("*/weights/best.pt");
        for path in glob::glob(&pattern.to_string_lossy())?.flatten() {
            if path.is_file() {
                return Ok(path);
            }
        }
    }

    Err(anyhow!("no trained weights found, looked for {:?}", candidates))
}

/// Runs one training job
pub struct Trainer {
    config: TrainConfig,
    program: String,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Result<Self> {
        if !config.data_yaml.is_file() {
            bail!("dataset YAML not found: {}", config.data_yaml.display());
        }
        std::fs::create_dir_all(&config.save_dir)
            .with_context(|| format!("Failed to create save directory: {:?}", config.save_dir))?;
        Ok(Self { config, program: "yolo".to_string() })
    }

    /// Use another executable instead of `yolo`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub async fn train(&self) -> Result<TrainResult> {
        log::info!(
            "training {} on {} for {} epoch(s) at {}px",
            self.config.base_model,
            self.config.data_yaml.display(),
            self.config.epochs,
            self.config.imgsz
        );

        // ultralytics prints its own progress; pass it straight through
        let status = Command::new(&self.program)
            .args(train_args(&self.config))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("Failed to execute `{} detect train`", self.program))?;
        if !status.success() {
            bail!("`{} detect train` exited with {status}", self.program);
        }

        let best = find_trained_weights(&self.config.run_dir())?;
        let weights = self.config.trained_weights();
        tokio::fs::copy(&best, &weights)
            .await
            .with_context(|| format!("Failed to copy {} to {}", best.display(), weights.display()))?;
        log::info!("weights saved to {}", weights.display());

        let onnx = if self.config.export_onnx {
            let exporter = OnnxExporter::new(&self.program, self.config.imgsz);
            Some(exporter.export(&weights).await?)
        } else {
            None
        };

        Ok(TrainResult { weights, onnx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_train_args() {
        let config = TrainConfig {
            data_yaml: PathBuf::from("data/coco8.yaml"),
            save_dir: PathBuf::from("out"),
            ..Default::default()
        };
        let args = train_args(&config);
        assert_eq!(&args[..2], ["detect", "train"]);
        assert!(args.contains(&"data=data/coco8.yaml".to_string()));
        assert!(args.contains(&"model=yolov8n.pt".to_string()));
        assert!(args.contains(&"epochs=100".to_string()));
        assert!(args.contains(&"imgsz=640".to_string()));
        assert!(args.iter().any(|a| a.starts_with("project=out")));
        assert!(!args.iter().any(|a| a.starts_with("device=")));

        let on_gpu = TrainConfig { device: Some("0".into()), ..config };
        assert_eq!(train_args(&on_gpu).last().map(String::as_str), Some("device=0"));
    }

    #[test]
    fn test_find_weights_prefers_best() {
        let temp_dir = tempdir().unwrap();
        let run = temp_dir.path().join("runs/train");
        std::fs::create_dir_all(run.join("weights")).unwrap();
        std::fs::write(run.join("weights/last.pt"), b"last").unwrap();
        assert_eq!(find_trained_weights(&run).unwrap(), run.join("weights/last.pt"));

        std::fs::write(run.join("weights/best.pt"), b"best").unwrap();
        assert_eq!(find_trained_weights(&run).unwrap(), run.join("weights/best.pt"));
    }

    #[test]
    fn test_find_weights_in_sibling_run() {
        let temp_dir = tempdir().unwrap();
        let runs = temp_dir.path().join("runs");
        std::fs::create_dir_all(runs.join("train2/weights")).unwrap();
        std::fs::write(runs.join("train2/weights/best.pt"), b"best").unwrap();
        let found = find_trained_weights(&runs.join("train")).unwrap();
        assert_eq!(found, runs.join("train2/weights/best.pt"));
    }

    #[test]
    fn test_find_weights_nonexistent() {
        let temp_dir = tempdir().unwrap();
        assert!(find_trained_weights(&temp_dir.path().join("runs/train")).is_err());
    }

    #[test]
    fn test_trainer_requires_dataset() {
        let temp_dir = tempdir().unwrap();
        let config = TrainConfig {
            data_yaml: temp_dir.path().join("missing.yaml"),
            save_dir: temp_dir.path().join("models"),
            ..Default::default()
        };
        let err = Trainer::new(config).err().unwrap();
        assert!(err.to_string().contains("missing.yaml"));
    }
}
