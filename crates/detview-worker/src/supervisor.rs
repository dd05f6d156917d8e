use crate::{CaptureWorker, DisplaySink, Result, WorkerSpec, WorkerState};
use detview_camera::{CaptureConfig, CaptureProvider, DeviceLeases, DeviceRef};
use detview_detect::SharedAdapter;
use std::sync::Arc;

/// Runs at most one worker feeding a single display.
///
/// Starting a new device stops the current worker and hands it to the new
/// worker's thread, which joins it before opening anything. Two sources are
/// never being read at the same time, and `start` never waits on a read.
pub struct Supervisor {
    provider: Arc<dyn CaptureProvider>,
    adapter: SharedAdapter,
    config: CaptureConfig,
    leases: DeviceLeases,
    sink: DisplaySink,
    current: Option<CaptureWorker>,
}

impl Supervisor {
    pub fn new(provider: Arc<dyn CaptureProvider>, adapter: SharedAdapter, config: CaptureConfig, sink: DisplaySink) -> Self {
        Self { provider, adapter, config, leases: DeviceLeases::new(), sink, current: None }
    }

    /// Share a lease registry with other supervisors or managers.
    pub fn with_leases(mut self, leases: DeviceLeases) -> Self {
        self.leases = leases;
        self
    }

    pub fn provider(&self) -> &Arc<dyn CaptureProvider> {
        &self.provider
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn leases(&self) -> &DeviceLeases {
        &self.leases
    }

    /// Probe camera indices. The device the current worker holds is listed
    /// without being opened a second time.
    pub fn enumerate(&self, probe_limit: u32) -> Vec<u32> {
        self.provider.enumerate(probe_limit, &self.config, &self.leases)
    }

    /// Use `adapter` for every worker started from now on. The current
    /// worker is told to stop.
    pub fn replace_adapter(&mut self, adapter: SharedAdapter) {
        self.stop();
        self.adapter = adapter;
    }

    pub fn start(&mut self, device: DeviceRef) -> Result<()> {
        let previous = self.current.take();
        if let Some(previous) = &previous {
            log::info!("switching from {} to {device}", previous.device());
        }
        let spec = WorkerSpec {
            device,
            provider: Arc::clone(&self.provider),
            adapter: Arc::clone(&self.adapter),
            config: self.config.clone(),
            leases: self.leases.clone(),
        };
        self.current = Some(CaptureWorker::spawn_after(spec, self.sink.claim(), previous)?);
        Ok(())
    }

    /// Signal the current worker to stop. Returns without waiting.
    pub fn stop(&mut self) {
        if let Some(worker) = &self.current {
            worker.stop();
        }
    }

    pub fn state(&self) -> Option<WorkerState> {
        self.current.as_ref().map(|w| w.state())
    }

    pub fn device(&self) -> Option<&DeviceRef> {
        self.current.as_ref().map(|w| w.device())
    }

    pub fn generation(&self) -> Option<u64> {
        self.current.as_ref().map(|w| w.generation())
    }

    pub fn is_active(&self) -> bool {
        self.state().map(|s| !s.is_terminal()).unwrap_or(false)
    }

    /// Stop and join the current worker.
    pub fn shutdown(&mut self) {
        if let Some(mut worker) = self.current.take() {
            worker.stop_and_join();
            log::info!("supervisor shut down ({} {})", worker.device(), worker.state());
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
