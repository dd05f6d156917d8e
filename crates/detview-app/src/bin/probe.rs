//! Enumerate cameras, open each one and read a single frame.

use anyhow::Result;
use clap::Parser;
use detview_app::{init_logging, ViewerConfig};
use detview_camera::providers::default_provider;
use detview_camera::{CaptureProvider, DeviceLeases, DeviceRef, FrameRead};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "detview-probe", about = "Test which cameras can be opened")]
struct CliArgs {
    /// Highest camera index (exclusive) to try
    #[arg(long)]
    limit: Option<u32>,

    /// Viewer config with capture settings
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let args = CliArgs::parse();
    let config = ViewerConfig::load_or_default(args.config.as_deref())?;
    let limit = args.limit.unwrap_or(config.probe_limit);

    let provider = default_provider();
    let found = provider.enumerate(limit, &config.capture, &DeviceLeases::new());
    if found.is_empty() {
        println!("no cameras found (tried indices 0..{limit})");
        return Ok(());
    }

    for index in found {
        let device = DeviceRef::Index(index);
        let mut source = match provider.open(&device, &config.capture) {
            Ok(source) => source,
            Err(e) => {
                println!("{device}: FAILED to open: {e}");
                continue;
            }
        };
        match source.read_frame() {
            Ok(FrameRead::Frame(frame)) => {
                println!("{device}: ok {}x{} via {}", frame.width(), frame.height(), source.backend())
            }
            Ok(FrameRead::EndOfStream) => println!("{device}: opened but returned no frame"),
            Err(e) => println!("{device}: FAILED to read: {e}"),
        }
        source.close();
    }
    Ok(())
}
