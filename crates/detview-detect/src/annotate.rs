use crate::Detection;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
    [52, 69, 147],
    [203, 56, 255],
];

pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Copy of `image` with a two-pixel box per detection plus a small filled tab
/// in the class colour at the top-left corner.
pub fn annotate(image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut out = image.clone();
    for det in detections {
        let color = class_color(det.class_id);
        let x = det.bbox.x.round() as i32;
        let y = det.bbox.y.round() as i32;
        let w = det.bbox.w.round() as u32;
        let h = det.bbox.h.round() as u32;
        if w == 0 || h == 0 {
            continue;
        }
        draw_hollow_rect_mut(&mut out, Rect::at(x, y).of_size(w, h), color);
        if w > 2 && h > 2 {
            draw_hollow_rect_mut(&mut out, Rect::at(x + 1, y + 1).of_size(w - 2, h - 2), color);
        }
        let tab = (w / 4).clamp(1, 12);
        draw_filled_rect_mut(&mut out, Rect::at(x, y).of_size(tab, tab.min(h)), color);
    }
    out
}
