//! Concrete [`CaptureProvider`](crate::CaptureProvider) implementations.

mod composite;
mod still;

#[cfg(feature = "opencv")]
mod opencv_capture;
#[cfg(feature = "gstreamer")]
mod gst_capture;

pub use composite::CompositeProvider;
pub use still::{is_image_path, StillImageProvider, IMAGE_EXTENSIONS};

#[cfg(feature = "opencv")]
pub use opencv_capture::OpenCvProvider;
#[cfg(feature = "gstreamer")]
pub use gst_capture::GstProvider;

/// Provider stack for this build: still images first, then whichever native
/// backend was compiled in.
pub fn default_provider() -> CompositeProvider {
    #[allow(unused_mut)]
    let mut composite = CompositeProvider::new().with(StillImageProvider::new());
    #[cfg(feature = "opencv")]
    composite.push(Box::new(OpenCvProvider::new()));
    #[cfg(feature = "gstreamer")]
    composite.push(Box::new(GstProvider::new()));
    if composite.len() == 1 {
        log::warn!("no native capture backend compiled in; only still images can be opened");
    }
    composite
}
