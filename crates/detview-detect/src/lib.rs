// detview-detect/src/lib.rs
// ============================================================
// detview-detect  –  Object-detection stage for detview
// Runs a YOLOv8 ONNX network via Tract (pure Rust) and draws
// the results on a copy of the captured frame.
// ------------------------------------------------------------
// Pipeline: Frame → letterbox → Tensor → Vec<Detection>
//           → annotated Frame
// ------------------------------------------------------------
// Public API
//   * TractYolo::new(path, size)   – load & optimise ONNX
//   * Detector::detect(&RgbImage)  – boxes in frame pixels
//   * InferenceAdapter::infer()    – detections + annotated copy
// ============================================================

//! detview – detection layer
//!
//! A backend-agnostic [`Detector`] trait, the Tract implementation
//! [`TractYolo`], and the [`InferenceAdapter`] the capture worker calls once
//! per frame. [`Annotating`] glues the two together: detect, then draw
//! class-coloured boxes. The raw frame is never touched; the annotated copy
//! shares its sequence number and timestamp.

mod adapter;
mod annotate;
mod error;
mod labels;
mod nms;
mod preprocess;
mod types;
mod yolo;

pub use adapter::{shared, Annotating, Detector, Inference, InferenceAdapter, SharedAdapter};
pub use annotate::{annotate, class_color};
pub use error::{DetectError, Result};
pub use labels::{label_for, COCO_CLASSES};
pub use nms::{non_max_suppression, MAX_DETECTIONS};
pub use preprocess::{to_tensor, Letterbox, PAD_VALUE};
pub use types::{BBox, Detection};
pub use yolo::{decode_output, TractYolo, DEFAULT_CONFIDENCE, DEFAULT_INPUT_SIZE, DEFAULT_IOU};
