use detview_camera::providers::IMAGE_EXTENSIONS;
use std::path::Path;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// Classify a file by extension; `None` for anything the viewer won't open.
pub fn classify(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(classify(Path::new("a.JPEG")), Some(MediaKind::Image));
        assert_eq!(classify(Path::new("dir/clip.mkv")), Some(MediaKind::Video));
        assert_eq!(classify(Path::new("notes.txt")), None);
        assert_eq!(classify(Path::new("Makefile")), None);
    }
}
