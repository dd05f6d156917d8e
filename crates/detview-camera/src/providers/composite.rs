use crate::{Backend, CameraError, CaptureConfig, CaptureProvider, DeviceLeases, DeviceRef, FrameSource, Result};

/// Routes every device to the inner providers that accept it, in order.
///
/// `open` falls through to the next accepting provider when one fails, and
/// the final error lists every backend tried across all of them.
/// Enumeration returns the first non-empty result, so it keeps the prefix
/// shape of [`crate::probe_devices`].
pub struct CompositeProvider {
    inner: Vec<Box<dyn CaptureProvider>>,
}

impl CompositeProvider {
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    pub fn with(mut self, provider: impl CaptureProvider + 'static) -> Self {
        self.inner.push(Box::new(provider));
        self
    }

    pub fn push(&mut self, provider: Box<dyn CaptureProvider>) {
        self.inner.push(provider);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn routes<'a>(&'a self, device: &'a DeviceRef) -> impl Iterator<Item = &'a dyn CaptureProvider> + 'a {
        self.inner.iter().map(|p| p.as_ref()).filter(move |p| p.accepts(device))
    }
}

impl Default for CompositeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureProvider for CompositeProvider {
    fn name(&self) -> &str {
        "composite"
    }

    fn backends(&self) -> Vec<Backend> {
        let mut all = Vec::new();
        for backend in self.inner.iter().flat_map(|p| p.backends()) {
            if !all.contains(&backend) {
                all.push(backend);
            }
        }
        all
    }

    fn accepts(&self, device: &DeviceRef) -> bool {
        self.routes(device).next().is_some()
    }

    fn open_with(&self, device: &DeviceRef, backend: Backend, config: &CaptureConfig) -> Result<Box<dyn FrameSource>> {
        let mut last = CameraError::UnsupportedBackend { device: device.clone(), backend };
        for provider in self.routes(device) {
            match provider.open_with(device, backend, config) {
                Ok(source) => return Ok(source),
                Err(err) => last = err,
            }
        }
        Err(last)
    }

    fn open(&self, device: &DeviceRef, config: &CaptureConfig) -> Result<Box<dyn FrameSource>> {
        let mut tried = Vec::new();
        for provider in self.routes(device) {
            log::debug!("{device} routed to {}", provider.name());
            match provider.open(device, config) {
                Ok(source) => return Ok(source),
                Err(CameraError::DeviceUnavailable { tried: more, .. }) => tried.extend(more),
                Err(err) => log::warn!("{}: {err}", provider.name()),
            }
        }
        Err(CameraError::DeviceUnavailable { device: device.clone(), tried })
    }

    fn enumerate(&self, probe_limit: u32, config: &CaptureConfig, leases: &DeviceLeases) -> Vec<u32> {
        let first = DeviceRef::Index(0);
        let found = self
            .routes(&first)
            .map(|provider| provider.enumerate(probe_limit, config, leases))
            .find(|found| !found.is_empty())
            .unwrap_or_default();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::StillImageProvider;
    use crate::FrameRead;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Camera provider that opens only with `works` and counts attempts.
    struct Cams {
        name: &'static str,
        backends: Vec<Backend>,
        works: Option<Backend>,
        attempts: Arc<AtomicUsize>,
    }

    impl Cams {
        fn new(name: &'static str, backends: &[Backend], works: Option<Backend>) -> Self {
            Self { name, backends: backends.to_vec(), works, attempts: Arc::default() }
        }
    }

    struct Idle(DeviceRef, Backend);

    impl FrameSource for Idle {
        fn device(&self) -> &DeviceRef {
            &self.0
        }
        fn backend(&self) -> Backend {
            self.1
        }
        fn read_frame(&mut self) -> Result<FrameRead> {
            Ok(FrameRead::EndOfStream)
        }
        fn close(self: Box<Self>) {}
    }

    impl CaptureProvider for Cams {
        fn name(&self) -> &str {
            self.name
        }
        fn backends(&self) -> Vec<Backend> {
            self.backends.clone()
        }
        fn open_with(&self, device: &DeviceRef, backend: Backend, _config: &CaptureConfig) -> Result<Box<dyn FrameSource>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.works == Some(backend) && device.index() == Some(0) {
                Ok(Box::new(Idle(device.clone(), backend)))
            } else {
                Err(CameraError::UnsupportedBackend { device: device.clone(), backend })
            }
        }
    }

    #[test]
    fn unroutable_device_reports_no_backends_tried() {
        let composite = CompositeProvider::new().with(StillImageProvider::new());
        let err = composite.open(&DeviceRef::Index(0), &CaptureConfig::default()).err().unwrap();
        match err {
            CameraError::DeviceUnavailable { tried, .. } => assert!(tried.is_empty()),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn enumerate_without_camera_provider_is_empty() {
        let composite = CompositeProvider::new().with(StillImageProvider::new());
        assert!(composite.enumerate(10, &CaptureConfig::default(), &DeviceLeases::new()).is_empty());
        assert!(composite.accepts(&DeviceRef::Path(PathBuf::from("shot.png"))));
    }

    #[test]
    fn falls_through_to_the_next_accepting_provider() {
        let first = Cams::new("first", &[Backend::DirectShow, Backend::Any], None);
        let first_attempts = Arc::clone(&first.attempts);
        let composite = CompositeProvider::new()
            .with(first)
            .with(Cams::new("second", &[Backend::V4l2], Some(Backend::V4l2)));

        let source = composite.open(&DeviceRef::Index(0), &CaptureConfig::default()).expect("second provider opens");
        assert_eq!(source.backend(), Backend::V4l2);
        assert_eq!(first_attempts.load(Ordering::SeqCst), 2);
        source.close();

        // the second provider also enumerates once the first finds nothing
        assert_eq!(composite.enumerate(4, &CaptureConfig::default(), &DeviceLeases::new()), vec![0]);
    }

    #[test]
    fn failure_lists_backends_from_every_provider() {
        let composite = CompositeProvider::new()
            .with(Cams::new("first", &[Backend::DirectShow, Backend::Any], None))
            .with(Cams::new("second", &[Backend::V4l2], None));
        let err = composite.open(&DeviceRef::Index(1), &CaptureConfig::default()).err().unwrap();
        match err {
            CameraError::DeviceUnavailable { tried, .. } => {
                assert_eq!(tried, vec![Backend::DirectShow, Backend::Any, Backend::V4l2])
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
