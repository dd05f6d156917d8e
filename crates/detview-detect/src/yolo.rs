use crate::labels::label_for;
use crate::nms::non_max_suppression;
use crate::preprocess::{to_tensor, Letterbox};
use crate::{DetectError, Detection, Detector, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;

pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_IOU: f32 = 0.45;

type Plan = RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Tract-powered YOLOv8 detector.
pub struct TractYolo {
    model: Plan,
    path: PathBuf,
    input_size: u32,
    confidence: f32,
    iou: f32,
}

impl TractYolo {
    /// Load and optimise the ONNX model for a fixed `input_size` square input.
    pub fn new(model_path: impl AsRef<Path>, input_size: u32) -> Result<Self> {
        let path = model_path.as_ref().to_path_buf();
        let load_err = |reason: String| DetectError::ModelLoad { path: path.clone(), reason };
        if !path.is_file() {
            return Err(load_err("file not found".into()));
        }

        let size = input_size as i32;
        let model = tract_onnx::onnx()
            .model_for_path(&path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| load_err(format!("{e:#}")))?;

        log::info!("loaded {} ({input_size}x{input_size})", path.display());
        Ok(Self { model, path, input_size, confidence: DEFAULT_CONFIDENCE, iou: DEFAULT_IOU })
    }

    pub fn with_thresholds(mut self, confidence: f32, iou: f32) -> Self {
        self.confidence = confidence;
        self.iou = iou;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl Detector for TractYolo {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        let lb = Letterbox::new(image.width(), image.height(), self.input_size);
        let input = to_tensor(&lb.apply(image));
        let outputs = self.model.run(tvec!(input.into()))?;
        let view = outputs[0].to_array_view::<f32>()?;
        let dets = decode_output(view, &lb, self.confidence)?;
        log::debug!("{} candidate box(es) above {}", dets.len(), self.confidence);
        Ok(non_max_suppression(dets, self.iou))
    }
}

/// Anchor count of a YOLOv8 head for a square `size` input (strides 8, 16, 32).
pub fn anchor_count(size: u32) -> usize {
    [8u32, 16, 32]
        .iter()
        .map(|stride| {
            let cells = size.div_ceil(*stride) as usize;
            cells * cells
        })
        .sum()
}

/// Decode a YOLOv8 head `[1, 4 + classes, anchors]` into frame-space
/// detections above `confidence`. The transposed `[1, anchors, 4 + classes]`
/// layout some exporters emit is accepted as well; it is recognised by the
/// anchor count for the letterbox size, never by comparing axis lengths.
pub fn decode_output(
    view: tract_ndarray::ArrayViewD<'_, f32>,
    lb: &Letterbox,
    confidence: f32,
) -> Result<Vec<Detection>> {
    let shape = view.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 || shape[1].min(shape[2]) <= 4 {
        return Err(DetectError::InvalidOutputShape(shape));
    }
    let rows = view.index_axis_move(tract_ndarray::Axis(0), 0);
    // attributes along axis 0, anchors along axis 1
    let anchors = anchor_count(lb.size);
    let transposed = shape[1] == anchors && shape[2] != anchors;
    let rows = if transposed { rows.reversed_axes() } else { rows };
    let attrs = rows.shape()[0];

    let mut dets = Vec::new();
    for anchor in 0..rows.shape()[1] {
        let (class_id, score) = (4..attrs)
            .map(|a| (a - 4, rows[[a, anchor]]))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < confidence {
            continue;
        }
        let bbox = lb.unmap(rows[[0, anchor]], rows[[1, anchor]], rows[[2, anchor]], rows[[3, anchor]]);
        if bbox.area() <= 0.0 {
            continue;
        }
        dets.push(Detection { bbox, class_id, label: label_for(class_id), score });
    }
    Ok(dets)
}
