use anyhow::Result;
use clap::Parser;
use detview_train::{TrainConfig, Trainer};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "detview-train", about = "Train a YOLO detector and export it for detview")]
struct CliArgs {
    /// Dataset YAML
    #[arg(long)]
    yaml: PathBuf,

    #[arg(long, default_value_t = 100)]
    epochs: u32,

    #[arg(long, default_value_t = 640)]
    imgsz: u32,

    #[arg(long, default_value = "./models")]
    save_dir: PathBuf,

    /// Base weights to start from
    #[arg(long, default_value = "yolov8n.pt")]
    model: String,

    /// Training device (`cpu`, `0`, ...); ultralytics decides when omitted
    #[arg(long)]
    device: Option<String>,

    /// Skip the ONNX export step
    #[arg(long)]
    no_onnx: bool,
}

impl From<CliArgs> for TrainConfig {
    fn from(args: CliArgs) -> Self {
        TrainConfig {
            data_yaml: args.yaml,
            epochs: args.epochs,
            imgsz: args.imgsz,
            save_dir: args.save_dir,
            base_model: args.model,
            device: args.device,
            export_onnx: !args.no_onnx,
        }
    }
}

async fn run(config: TrainConfig) -> Result<()> {
    let trainer = Trainer::new(config)?;
    let result = trainer.train().await?;
    println!("Training complete, weights saved to {}", result.weights.display());
    if let Some(onnx) = result.onnx {
        println!("ONNX model saved to {}", onnx.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = TrainConfig::from(CliArgs::parse());
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Training failed: {e:#}");
            ExitCode::from(1)
        }
    }
}
