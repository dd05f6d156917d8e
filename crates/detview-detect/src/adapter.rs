use crate::{annotate, Detection, Result};
use detview_camera::Frame;
use image::RgbImage;
use std::sync::{Arc, Mutex};

/// Backend-agnostic object detector.
pub trait Detector: Send {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>>;
}

/// Output of one inference call.
#[derive(Debug, Clone)]
pub struct Inference {
    /// Same capture identity as the input frame.
    pub annotated: Frame,
    pub detections: Vec<Detection>,
}

/// Turns a raw frame into an annotated frame plus detections.
pub trait InferenceAdapter: Send {
    fn infer(&mut self, frame: &Frame) -> Result<Inference>;
}

/// One adapter shared by successive workers so the model is loaded once.
pub type SharedAdapter = Arc<Mutex<dyn InferenceAdapter>>;

pub fn shared<A: InferenceAdapter + 'static>(adapter: A) -> SharedAdapter {
    Arc::new(Mutex::new(adapter))
}

/// Runs a [`Detector`] and draws its boxes on a copy of the frame.
pub struct Annotating<D> {
    detector: D,
}

impl<D: Detector> Annotating<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }
}

impl<D: Detector> InferenceAdapter for Annotating<D> {
    fn infer(&mut self, frame: &Frame) -> Result<Inference> {
        let detections = self.detector.detect(frame.image())?;
        let annotated = frame.derive(annotate::annotate(frame.image(), &detections));
        Ok(Inference { annotated, detections })
    }
}
