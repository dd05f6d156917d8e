//! Device references and capture backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Identifies one logical capture source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceRef {
    /// Camera by zero-based index.
    Index(u32),
    /// Local file or directory.
    Path(PathBuf),
    /// Network stream such as `rtsp://…`.
    Uri(String),
}

impl DeviceRef {
    pub fn index(&self) -> Option<u32> {
        match self {
            DeviceRef::Index(i) => Some(*i),
            _ => None,
        }
    }

    /// Cameras keep producing frames until they fail; files and streams end.
    pub fn is_camera(&self) -> bool {
        matches!(self, DeviceRef::Index(_))
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRef::Index(i) => write!(f, "camera {i}"),
            DeviceRef::Path(p) => write!(f, "{}", p.display()),
            DeviceRef::Uri(u) => f.write_str(u),
        }
    }
}

impl From<u32> for DeviceRef {
    fn from(index: u32) -> Self {
        DeviceRef::Index(index)
    }
}

impl From<PathBuf> for DeviceRef {
    fn from(path: PathBuf) -> Self {
        DeviceRef::Path(path)
    }
}

impl FromStr for DeviceRef {
    type Err = std::convert::Infallible;

    /// `"2"` and `"/dev/video2"` are camera 2, anything with a scheme is a
    /// stream URI, everything else a path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<u32>() {
            return Ok(DeviceRef::Index(index));
        }
        if let Some(stripped) = s.strip_prefix("/dev/video") {
            if let Ok(index) = stripped.parse::<u32>() {
                return Ok(DeviceRef::Index(index));
            }
        }
        if s.contains("://") {
            return Ok(DeviceRef::Uri(s.to_string()));
        }
        Ok(DeviceRef::Path(PathBuf::from(s)))
    }
}

/// Platform capture driver preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    MediaFoundation,
    DirectShow,
    AvFoundation,
    V4l2,
    GStreamer,
    /// Whatever the provider picks by default.
    Any,
}

impl Backend {
    /// Native backend for the target OS first, then the provider default.
    pub fn platform_preference() -> Vec<Backend> {
        let native = if cfg!(target_os = "windows") {
            Some(Backend::MediaFoundation)
        } else if cfg!(target_os = "macos") {
            Some(Backend::AvFoundation)
        } else if cfg!(target_os = "linux") {
            Some(Backend::V4l2)
        } else {
            None
        };
        native.into_iter().chain(std::iter::once(Backend::Any)).collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::MediaFoundation => "MediaFoundation",
            Backend::DirectShow => "DirectShow",
            Backend::AvFoundation => "AVFoundation",
            Backend::V4l2 => "V4L2",
            Backend::GStreamer => "GStreamer",
            Backend::Any => "default",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indices_and_video_nodes() {
        assert_eq!("0".parse::<DeviceRef>().unwrap(), DeviceRef::Index(0));
        assert_eq!("/dev/video3".parse::<DeviceRef>().unwrap(), DeviceRef::Index(3));
    }

    #[test]
    fn parses_uris_and_paths() {
        assert_eq!(
            "rtsp://cam.local/stream".parse::<DeviceRef>().unwrap(),
            DeviceRef::Uri("rtsp://cam.local/stream".into())
        );
        assert_eq!(
            "clips/street.mp4".parse::<DeviceRef>().unwrap(),
            DeviceRef::Path(PathBuf::from("clips/street.mp4"))
        );
        // not a video node, just a path that happens to start alike
        assert!(matches!("/dev/videoX".parse::<DeviceRef>().unwrap(), DeviceRef::Path(_)));
    }

    #[test]
    fn display_names_cameras_by_index() {
        assert_eq!(DeviceRef::Index(2).to_string(), "camera 2");
    }

    #[test]
    fn platform_preference_ends_with_default() {
        let prefs = Backend::platform_preference();
        assert_eq!(prefs.last(), Some(&Backend::Any));
        assert!(!prefs.is_empty());
    }
}
