use crate::Detection;
use std::cmp::Ordering;

/// Upper bound on detections kept per frame.
pub const MAX_DETECTIONS: usize = 300;

/// Class-aware greedy non-maximum suppression: a box is dropped only when a
/// higher-scoring box of the same class overlaps it by more than `iou_thr`.
pub fn non_max_suppression(mut dets: Vec<Detection>, iou_thr: f32) -> Vec<Detection> {
    dets.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut keep: Vec<Detection> = Vec::with_capacity(dets.len().min(MAX_DETECTIONS));

    'outer: for d in dets {
        for k in &keep {
            if k.class_id == d.class_id && d.bbox.iou(&k.bbox) > iou_thr {
                continue 'outer;
            }
        }
        keep.push(d);
        if keep.len() >= MAX_DETECTIONS {
            break;
        }
    }
    keep
}
