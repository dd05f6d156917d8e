use crate::media::{classify, MediaKind};
use crate::{load_adapter, ViewerConfig};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use detview_camera::{CaptureProvider, DeviceRef};
use detview_detect::SharedAdapter;
use detview_worker::{display_channel, DisplayReceiver, FramePair, Supervisor, WorkerEvent, WorkerState};
use std::path::Path;
use std::sync::Arc;

/// Glue between the window and the capture side.
///
/// Device I/O, enumeration and inference never run on the calling thread.
/// Switching sources hands the old worker to the new one, and
/// [`refresh_devices`](Self::refresh_devices) probes on a helper thread
/// whose result is picked up by [`poll`](Self::poll). The one exception is
/// [`change_model`](Self::change_model), which loads the model in place.
/// Failures end up in [`UiController::status`].
pub struct UiController {
    supervisor: Supervisor,
    receiver: DisplayReceiver,
    config: ViewerConfig,
    model_cursor: Option<usize>,
    devices: Vec<u32>,
    probing: Option<Receiver<Vec<u32>>>,
    status: String,
    current: Option<FramePair>,
    last_state: Option<WorkerState>,
}

impl UiController {
    pub fn new(provider: Arc<dyn CaptureProvider>, adapter: SharedAdapter, config: &ViewerConfig) -> Self {
        let (sink, receiver) = display_channel();
        Self {
            supervisor: Supervisor::new(provider, adapter, config.capture.clone(), sink),
            receiver,
            config: config.clone(),
            model_cursor: config.models.iter().position(|m| *m == config.model),
            devices: Vec::new(),
            probing: None,
            status: "ready".into(),
            current: None,
            last_state: None,
        }
    }

    /// Start probing cameras in the background. The camera the current
    /// worker holds is listed without being reopened.
    pub fn refresh_devices(&mut self) {
        if self.probing.is_some() {
            log::debug!("device probe already running");
            return;
        }
        let provider = Arc::clone(self.supervisor.provider());
        let config = self.supervisor.config().clone();
        let leases = self.supervisor.leases().clone();
        let limit = self.config.probe_limit;
        let (tx, rx) = bounded(1);
        let spawned = std::thread::Builder::new().name("device-probe".into()).spawn(move || {
            // the controller may be gone by the time the probe finishes
            let _ = tx.send(provider.enumerate(limit, &config, &leases));
        });
        match spawned {
            Ok(_) => {
                self.probing = Some(rx);
                self.status = "probing cameras".into();
            }
            Err(e) => {
                log::error!("failed to spawn device probe: {e}");
                self.status = format!("device probe failed: {e}");
            }
        }
    }

    pub fn is_probing(&self) -> bool {
        self.probing.is_some()
    }

    pub fn devices(&self) -> &[u32] {
        &self.devices
    }

    pub fn start_camera(&mut self, index: u32) -> bool {
        self.start(DeviceRef::Index(index))
    }

    /// Like [`start_camera`](Self::start_camera), but a no-op when that
    /// camera is already running.
    pub fn switch_camera(&mut self, index: u32) -> bool {
        let device = DeviceRef::Index(index);
        if self.supervisor.device() == Some(&device) && self.supervisor.is_active() {
            log::debug!("{device} already active");
            return true;
        }
        self.start(device)
    }

    /// Open an image or video file. Other extensions are rejected.
    pub fn open_media(&mut self, path: &Path) -> bool {
        match classify(path) {
            Some(kind) => {
                log::info!("opening {} ({kind:?})", path.display());
                self.start(DeviceRef::Path(path.to_path_buf()))
            }
            None => {
                log::warn!("rejected {}", path.display());
                self.status = format!("unsupported file type: {}", path.display());
                false
            }
        }
    }

    pub fn open_image(&mut self, path: &Path) -> bool {
        self.open_kind(path, MediaKind::Image)
    }

    pub fn open_video(&mut self, path: &Path) -> bool {
        self.open_kind(path, MediaKind::Video)
    }

    fn open_kind(&mut self, path: &Path, kind: MediaKind) -> bool {
        if classify(path) != Some(kind) {
            self.status = format!("not a {} file: {}", kind_name(kind), path.display());
            return false;
        }
        self.open_media(path)
    }

    fn start(&mut self, device: DeviceRef) -> bool {
        self.status = format!("starting {device}");
        // the old source's last frame must not sit next to the new status
        self.current = None;
        self.last_state = None;
        match self.supervisor.start(device) {
            Ok(()) => true,
            Err(e) => {
                log::error!("{e}");
                self.status = e.to_string();
                false
            }
        }
    }

    pub fn stop(&mut self) {
        self.supervisor.stop();
        self.status = "stopped".into();
    }

    pub fn model(&self) -> &Path {
        &self.config.model
    }

    /// Load `path` and use it from now on. The running source, if any, is
    /// restarted on the new model. When loading fails the old model stays
    /// and the reason goes to the status line.
    pub fn change_model(&mut self, path: &Path) -> bool {
        let mut config = self.config.clone();
        config.model = path.to_path_buf();
        let adapter = match load_adapter(&config) {
            Ok(adapter) => adapter,
            Err(e) => {
                log::error!("{e:#}");
                self.status = format!("failed to load model: {e:#}");
                return false;
            }
        };
        log::info!("switched model to {}", path.display());
        self.config = config;
        self.replace_adapter(adapter);
        if !self.supervisor.is_active() {
            self.status = format!("model {} loaded", path.display());
        }
        true
    }

    /// Swap in an already loaded adapter and restart the running source on it.
    pub fn replace_adapter(&mut self, adapter: SharedAdapter) {
        let running = self.supervisor.is_active().then(|| self.supervisor.device().cloned()).flatten();
        self.supervisor.replace_adapter(adapter);
        if let Some(device) = running {
            self.start(device);
        }
    }

    /// Move to the next entry of the configured model list.
    pub fn next_model(&mut self) -> bool {
        let count = self.config.models.len();
        if count == 0 {
            self.status = "no models configured".into();
            return false;
        }
        let next = self.model_cursor.map(|i| (i + 1) % count).unwrap_or(0);
        self.model_cursor = Some(next);
        let path = self.config.models[next].clone();
        self.change_model(&path)
    }

    /// Apply pending worker events and pick up the newest frame pair.
    pub fn poll(&mut self) -> Option<&FramePair> {
        self.poll_probe();
        let generation = self.receiver.current_generation();
        for event in self.receiver.drain_events() {
            if event.generation() != generation {
                continue;
            }
            match event {
                WorkerEvent::Status { message, .. } => self.status = message,
                WorkerEvent::StateChanged { device, state, .. } => {
                    log::info!("{device}: {state}");
                    self.last_state = Some(state);
                }
            }
        }
        if let Some(pair) = self.receiver.take_latest() {
            self.current = Some(pair);
        }
        self.current.as_ref()
    }

    fn poll_probe(&mut self) {
        let Some(rx) = &self.probing else {
            return;
        };
        match rx.try_recv() {
            Ok(found) => {
                self.status = match found.len() {
                    0 => "no cameras found".into(),
                    n => format!("{n} camera(s) found"),
                };
                self.devices = found;
                self.probing = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                log::error!("device probe ended without a result");
                self.status = "device probe failed".into();
                self.probing = None;
            }
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn current(&self) -> Option<&FramePair> {
        self.current.as_ref()
    }

    /// Last state reported by the current worker through the event queue.
    pub fn worker_state(&self) -> Option<&WorkerState> {
        self.last_state.as_ref()
    }

    pub fn shutdown(&mut self) {
        self.supervisor.shutdown();
    }
}

impl Drop for UiController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn kind_name(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "image",
        MediaKind::Video => "video",
    }
}
