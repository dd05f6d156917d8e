//! Letterbox resize into the square model input and back.

use crate::BBox;
use image::{imageops, Rgb, RgbImage};
use tract_onnx::prelude::*;

/// Grey used for the padding bars, same as the Ultralytics exporter.
pub const PAD_VALUE: u8 = 114;

/// Geometry of one letterbox transform from a `src_w x src_h` frame into a
/// `size x size` model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub src_w: u32,
    pub src_h: u32,
    pub size: u32,
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    pub fn new(src_w: u32, src_h: u32, size: u32) -> Self {
        let scale = (size as f32 / src_w.max(1) as f32).min(size as f32 / src_h.max(1) as f32);
        let (new_w, new_h) = scaled(src_w, src_h, scale, size);
        Self {
            src_w,
            src_h,
            size,
            scale,
            pad_x: (size - new_w) / 2,
            pad_y: (size - new_h) / 2,
        }
    }

    /// Size of the resized image before padding.
    pub fn scaled_size(&self) -> (u32, u32) {
        scaled(self.src_w, self.src_h, self.scale, self.size)
    }

    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let (w, h) = self.scaled_size();
        let resized = imageops::resize(image, w, h, imageops::FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(self.size, self.size, Rgb([PAD_VALUE; 3]));
        imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);
        canvas
    }

    /// Map a centre/size box in model-input pixels back to the source frame,
    /// clamped to its bounds.
    pub fn unmap(&self, cx: f32, cy: f32, w: f32, h: f32) -> BBox {
        let fx = |v: f32| ((v - self.pad_x as f32) / self.scale).clamp(0.0, self.src_w as f32);
        let fy = |v: f32| ((v - self.pad_y as f32) / self.scale).clamp(0.0, self.src_h as f32);
        BBox::from_corners(fx(cx - w / 2.0), fy(cy - h / 2.0), fx(cx + w / 2.0), fy(cy + h / 2.0))
    }
}

fn scaled(src_w: u32, src_h: u32, scale: f32, size: u32) -> (u32, u32) {
    let w = ((src_w as f32 * scale).round() as u32).clamp(1, size);
    let h = ((src_h as f32 * scale).round() as u32).clamp(1, size);
    (w, h)
}

/// NCHW float tensor in `0..=1`.
pub fn to_tensor(image: &RgbImage) -> Tensor {
    let (w, h) = (image.width() as usize, image.height() as usize);
    tract_ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
        image.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    })
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_frame_is_padded_top_and_bottom() {
        let lb = Letterbox::new(1280, 720, 640);
        assert!((lb.scale - 0.5).abs() < 1e-6);
        assert_eq!(lb.scaled_size(), (640, 360));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 140));
    }

    #[test]
    fn apply_fills_padding_with_grey() {
        let lb = Letterbox::new(40, 20, 32);
        let out = lb.apply(&RgbImage::from_pixel(40, 20, Rgb([255, 0, 0])));
        assert_eq!(out.dimensions(), (32, 32));
        assert_eq!(out.get_pixel(0, 0), &Rgb([PAD_VALUE; 3]));
        let inner = out.get_pixel(16, 16);
        assert!(inner[0] > 250 && inner[1] < 5, "{inner:?}");
    }

    #[test]
    fn unmap_inverts_the_transform() {
        let lb = Letterbox::new(1280, 720, 640);
        // box centred in the model input covering 100x50 model pixels
        let b = lb.unmap(320.0, 320.0, 100.0, 50.0);
        assert!((b.x - 540.0).abs() < 1e-3);
        assert!((b.y - 310.0).abs() < 1e-3);
        assert!((b.w - 200.0).abs() < 1e-3);
        assert!((b.h - 100.0).abs() < 1e-3);
    }

    #[test]
    fn unmap_clamps_to_frame() {
        let lb = Letterbox::new(100, 100, 100);
        let b = lb.unmap(0.0, 0.0, 40.0, 40.0);
        assert_eq!((b.x, b.y, b.w, b.h), (0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn tensor_is_nchw_and_normalised() {
        let t = to_tensor(&RgbImage::from_pixel(4, 2, Rgb([255, 0, 51])));
        assert_eq!(t.shape(), &[1, 3, 2, 4]);
        let view = t.to_array_view::<f32>().unwrap();
        assert_eq!(view[[0, 0, 1, 3]], 1.0);
        assert!((view[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
    }
}
