use crate::{CameraError, DeviceRef, Result};
use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default, Debug)]
struct Registry {
    held: Mutex<HashSet<DeviceRef>>,
    released: Condvar,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashSet<DeviceRef>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Registry of devices currently owned by a worker or a probe.
///
/// Clones share the same registry. A device can be leased by one holder at a
/// time; the lease is given back when the [`DeviceLease`] is dropped.
#[derive(Clone, Default, Debug)]
pub struct DeviceLeases {
    registry: Arc<Registry>,
}

impl DeviceLeases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, device: &DeviceRef) -> Result<DeviceLease> {
        self.acquire_timeout(device, Duration::ZERO)
    }

    /// Like [`acquire`](Self::acquire), but waits up to `timeout` for the
    /// current holder to let go.
    pub fn acquire_timeout(&self, device: &DeviceRef, timeout: Duration) -> Result<DeviceLease> {
        let held = self.registry.lock();
        let (mut held, _) = self
            .registry
            .released
            .wait_timeout_while(held, timeout, |h| h.contains(device))
            .unwrap_or_else(|e| e.into_inner());
        if !held.insert(device.clone()) {
            return Err(CameraError::DeviceBusy(device.clone()));
        }
        Ok(DeviceLease { device: device.clone(), registry: Arc::clone(&self.registry) })
    }

    pub fn is_held(&self, device: &DeviceRef) -> bool {
        self.registry.lock().contains(device)
    }

    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive claim on one device.
#[derive(Debug)]
pub struct DeviceLease {
    device: DeviceRef,
    registry: Arc<Registry>,
}

impl DeviceLease {
    pub fn device(&self) -> &DeviceRef {
        &self.device
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.device);
        self.registry.released.notify_all();
    }
}
