use crate::{Backend, CameraError, CaptureConfig, DeviceLeases, DeviceRef, FrameRead, Result};

/// An open capture handle.
///
/// `close` consumes the boxed source, so nothing can read from a handle after
/// it has been released. Implementations also release in `Drop` for the
/// paths that never reach `close` (panics, early returns).
pub trait FrameSource: Send {
    fn device(&self) -> &DeviceRef;

    /// Backend that actually opened the device.
    fn backend(&self) -> Backend;

    /// Blocks until the next frame is available.
    fn read_frame(&mut self) -> Result<FrameRead>;

    fn close(self: Box<Self>);
}

/// Something that can open devices, with a backend preference list and
/// fallback, and can enumerate cameras.
pub trait CaptureProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Backends in preference order.
    fn backends(&self) -> Vec<Backend>;

    /// Whether this provider knows how to handle `device` at all.
    fn accepts(&self, _device: &DeviceRef) -> bool {
        true
    }

    /// Open `device` with exactly one backend.
    fn open_with(
        &self,
        device: &DeviceRef,
        backend: Backend,
        config: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>>;

    /// Try each backend in order and return the first that opens.
    fn open(&self, device: &DeviceRef, config: &CaptureConfig) -> Result<Box<dyn FrameSource>> {
        let mut tried = Vec::new();
        for backend in self.backends() {
            match self.open_with(device, backend, config) {
                Ok(source) => {
                    if !tried.is_empty() {
                        log::info!("{}: opened {device} with fallback backend {backend}", self.name());
                    }
                    return Ok(source);
                }
                Err(err) => {
                    log::warn!("{}: failed to open {device} with backend {backend}: {err}", self.name());
                    tried.push(backend);
                }
            }
        }
        Err(CameraError::DeviceUnavailable { device: device.clone(), tried })
    }

    /// Indices of cameras that can be opened, probing `0..probe_limit`.
    /// Devices leased in `leases` are reported without being opened again.
    fn enumerate(&self, probe_limit: u32, config: &CaptureConfig, leases: &DeviceLeases) -> Vec<u32> {
        crate::probe::probe_devices(self, probe_limit, config, leases)
    }
}
