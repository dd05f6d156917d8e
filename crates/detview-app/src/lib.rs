//! detview – viewer application layer
//!
//! [`UiController`] is everything the window needs: it owns the
//! [`Supervisor`](detview_worker::Supervisor) and the display receiver,
//! turns key presses and dropped files into worker commands and keeps the
//! status line. [`ViewerConfig`] is the JSON settings file.

mod config;
mod controller;
pub mod media;

pub use config::ViewerConfig;
pub use controller::UiController;
pub use media::{classify, MediaKind};

use anyhow::{Context, Result};
use detview_detect::{shared, Annotating, SharedAdapter, TractYolo};

/// Load the model named by `config` and wrap it for the worker.
pub fn load_adapter(config: &ViewerConfig) -> Result<SharedAdapter> {
    let yolo = TractYolo::new(&config.model, config.input_size)
        .with_context(|| format!("loading model {}", config.model.display()))?
        .with_thresholds(config.confidence, config.iou);
    Ok(shared(Annotating::new(yolo)))
}

/// `env_logger` with `info` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
