use crate::{display_channel, CaptureWorker, DisplayReceiver, Result, WorkerError, WorkerSpec, WorkerState};
use detview_camera::{CaptureConfig, CaptureProvider, DeviceLeases, DeviceRef};
use detview_detect::SharedAdapter;
use std::collections::HashMap;
use std::sync::Arc;

struct Managed {
    worker: CaptureWorker,
    receiver: DisplayReceiver,
}

/// Multi-camera variant: one independent worker and display channel per
/// device. Inference is serialised through the shared adapter.
pub struct CameraManager {
    provider: Arc<dyn CaptureProvider>,
    adapter: SharedAdapter,
    config: CaptureConfig,
    leases: DeviceLeases,
    workers: HashMap<DeviceRef, Managed>,
}

impl CameraManager {
    pub fn new(provider: Arc<dyn CaptureProvider>, adapter: SharedAdapter, config: CaptureConfig) -> Self {
        Self { provider, adapter, config, leases: DeviceLeases::new(), workers: HashMap::new() }
    }

    pub fn with_leases(mut self, leases: DeviceLeases) -> Self {
        self.leases = leases;
        self
    }

    /// Cameras that are running here are listed without being probed.
    pub fn enumerate(&self, probe_limit: u32) -> Vec<u32> {
        self.provider.enumerate(probe_limit, &self.config, &self.leases)
    }

    /// Start a worker for `device`. A device whose previous worker has
    /// already ended may be started again.
    pub fn start(&mut self, device: DeviceRef) -> Result<()> {
        if let Some(existing) = self.workers.get(&device) {
            if !existing.worker.state().is_terminal() {
                log::warn!("refusing to start {device}: already active");
                return Err(WorkerError::AlreadyActive(device));
            }
        }
        if let Some(mut old) = self.workers.remove(&device) {
            old.worker.join();
        }

        let (sink, receiver) = display_channel();
        let spec = WorkerSpec {
            device: device.clone(),
            provider: Arc::clone(&self.provider),
            adapter: Arc::clone(&self.adapter),
            config: self.config.clone(),
            leases: self.leases.clone(),
        };
        let worker = CaptureWorker::spawn(spec, sink.claim())?;
        self.workers.insert(device, Managed { worker, receiver });
        Ok(())
    }

    /// Enumerate cameras and start a worker on each one found.
    pub fn start_all(&mut self, probe_limit: u32) -> Vec<DeviceRef> {
        let mut started = Vec::new();
        for index in self.enumerate(probe_limit) {
            let device = DeviceRef::Index(index);
            match self.start(device.clone()) {
                Ok(()) => started.push(device),
                Err(WorkerError::AlreadyActive(_)) => {}
                Err(e) => log::error!("{e}"),
            }
        }
        started
    }

    /// Stop and join the worker for `device`. Returns `false` if unknown.
    pub fn stop(&mut self, device: &DeviceRef) -> bool {
        match self.workers.get_mut(device) {
            Some(managed) => {
                managed.worker.stop_and_join();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        // signal everyone first so the joins overlap
        for managed in self.workers.values() {
            managed.worker.stop();
        }
        for managed in self.workers.values_mut() {
            managed.worker.join();
        }
    }

    pub fn receiver(&self, device: &DeviceRef) -> Option<&DisplayReceiver> {
        self.workers.get(device).map(|m| &m.receiver)
    }

    pub fn state(&self, device: &DeviceRef) -> Option<WorkerState> {
        self.workers.get(device).map(|m| m.worker.state())
    }

    pub fn devices(&self) -> Vec<DeviceRef> {
        self.workers.keys().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.workers.values().filter(|m| !m.worker.state().is_terminal()).count()
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}
