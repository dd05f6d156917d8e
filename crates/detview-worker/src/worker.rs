use crate::{Publisher, Result, WorkerState};
use detview_camera::{CaptureConfig, CaptureProvider, DeviceLeases, DeviceRef, FrameRead, FrameSource};
use detview_detect::SharedAdapter;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// How long a worker waits for a device that a probe is briefly holding.
pub const LEASE_WAIT: Duration = Duration::from_secs(2);

/// Everything a worker needs to run one source.
#[derive(Clone)]
pub struct WorkerSpec {
    pub device: DeviceRef,
    pub provider: Arc<dyn CaptureProvider>,
    pub adapter: SharedAdapter,
    pub config: CaptureConfig,
    pub leases: DeviceLeases,
}

/// Handle to a capture/inference loop running on its own thread.
///
/// The thread owns the device from open to close; this handle only carries
/// the stop flag and a view of the state.
pub struct CaptureWorker {
    device: DeviceRef,
    generation: u64,
    stop: Arc<AtomicBool>,
    state: Arc<Mutex<WorkerState>>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    pub fn spawn(spec: WorkerSpec, publisher: Publisher) -> Result<Self> {
        Self::spawn_after(spec, publisher, None)
    }

    /// Spawn a worker that takes over from `previous`.
    ///
    /// `previous` is told to stop right away and joined on the new thread
    /// before the new device is opened, so the caller never waits on an
    /// in-flight read and the two sources are never open together.
    pub fn spawn_after(spec: WorkerSpec, publisher: Publisher, previous: Option<CaptureWorker>) -> Result<Self> {
        if let Some(previous) = &previous {
            previous.stop();
        }
        let stop = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(WorkerState::Idle));
        let device = spec.device.clone();
        let generation = publisher.generation();

        let mut ctx = WorkerContext {
            spec,
            publisher,
            stop: Arc::clone(&stop),
            state: Arc::clone(&state),
        };
        let handle = std::thread::Builder::new()
            .name(format!("capture-{device}"))
            .spawn(move || {
                if let Some(mut previous) = previous {
                    previous.join();
                }
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| run(&mut ctx))) {
                    let reason = format!("{} worker panicked: {}", ctx.spec.device, panic_message(&*payload));
                    ctx.fail(reason);
                }
            })?;
        log::info!("worker for {device} spawned (generation {generation})");

        Ok(Self { device, generation, stop, state, handle: Some(handle) })
    }

    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> WorkerState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Ask the loop to finish after the current frame. Never blocks.
    pub fn stop(&self) {
        if !self.stop.swap(true, Ordering::SeqCst) {
            log::debug!("stop requested for {}", self.device);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_finished()).unwrap_or(true)
    }

    /// Wait for the thread to exit. Safe to call more than once.
    pub fn join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            log::error!("worker for {} panicked", self.device);
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !state.is_terminal() {
                *state = WorkerState::Failed("worker panicked".into());
            }
        }
    }

    pub fn stop_and_join(&mut self) {
        self.stop();
        self.join();
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// State owned by the worker thread for the lifetime of the loop.
struct WorkerContext {
    spec: WorkerSpec,
    publisher: Publisher,
    stop: Arc<AtomicBool>,
    state: Arc<Mutex<WorkerState>>,
}

impl WorkerContext {
    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn transition(&mut self, next: WorkerState) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !state.can_transition_to(&next) {
                log::warn!("{}: ignoring transition {} -> {}", self.spec.device, *state, next);
                return;
            }
            *state = next.clone();
        }
        self.publisher.state(&self.spec.device, next);
    }

    fn fail(&mut self, reason: String) {
        log::error!("{reason}");
        self.transition(WorkerState::Failed(reason.clone()));
        self.publisher.status(reason);
    }
}

enum Outcome {
    Stopped,
    Finished,
    Failed(String),
}

fn run(ctx: &mut WorkerContext) {
    let device = ctx.spec.device.clone();
    if ctx.stop_requested() {
        ctx.transition(WorkerState::Stopped);
        ctx.publisher.status(format!("{device} stopped"));
        return;
    }

    let lease = match ctx.spec.leases.acquire_timeout(&device, LEASE_WAIT) {
        Ok(lease) => lease,
        Err(e) => return ctx.fail(e.to_string()),
    };
    let mut source = match ctx.spec.provider.open(&device, &ctx.spec.config) {
        Ok(source) => source,
        Err(e) => return ctx.fail(format!("{device} failed to open: {e}")),
    };

    ctx.transition(WorkerState::Running);
    ctx.publisher.status(format!("{device} running ({})", source.backend()));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| pump(ctx, source.as_mut()))).unwrap_or_else(|payload| {
        Outcome::Failed(format!("{device} worker panicked: {}", panic_message(&*payload)))
    });
    source.close();
    drop(lease);

    match outcome {
        Outcome::Stopped => {
            ctx.transition(WorkerState::Stopped);
            ctx.publisher.status(format!("{device} stopped"));
        }
        Outcome::Finished => {
            ctx.transition(WorkerState::Stopped);
            ctx.publisher.status(format!("{device} finished"));
        }
        Outcome::Failed(reason) => ctx.fail(reason),
    }
    log::info!("worker for {device} exited");
}

fn pump(ctx: &mut WorkerContext, source: &mut dyn FrameSource) -> Outcome {
    loop {
        if ctx.stop_requested() {
            ctx.transition(WorkerState::Stopping);
            return Outcome::Stopped;
        }

        let frame = match source.read_frame() {
            Ok(FrameRead::Frame(frame)) => frame,
            Ok(FrameRead::EndOfStream) => return Outcome::Finished,
            Err(e) => return Outcome::Failed(e.to_string()),
        };

        let inference = {
            let mut adapter = ctx.spec.adapter.lock().unwrap_or_else(|e| e.into_inner());
            adapter.infer(&frame)
        };
        match inference {
            Ok(out) => {
                log::debug!("{}: frame {} with {} detection(s)", ctx.spec.device, frame.seq(), out.detections.len());
                if !ctx.publisher.publish(frame, out.annotated, out.detections) {
                    log::debug!("{}: display superseded, frame dropped", ctx.spec.device);
                }
            }
            Err(e) => return Outcome::Failed(format!("inference failed on {}: {e}", ctx.spec.device)),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{display_channel, WorkerEvent};
    use detview_camera::{Backend, CameraError};
    use detview_detect::{shared, Inference, InferenceAdapter};
    use std::sync::atomic::AtomicUsize;

    struct CountingOpens(Arc<AtomicUsize>);

    impl CaptureProvider for CountingOpens {
        fn name(&self) -> &str {
            "counting"
        }
        fn backends(&self) -> Vec<Backend> {
            vec![Backend::Any]
        }
        fn open_with(
            &self,
            device: &DeviceRef,
            backend: Backend,
            _config: &CaptureConfig,
        ) -> detview_camera::Result<Box<dyn FrameSource>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(CameraError::UnsupportedBackend { device: device.clone(), backend })
        }
    }

    struct Echo;

    impl InferenceAdapter for Echo {
        fn infer(&mut self, frame: &detview_camera::Frame) -> detview_detect::Result<Inference> {
            Ok(Inference { annotated: frame.clone(), detections: Vec::new() })
        }
    }

    #[test]
    fn stop_before_open_never_touches_the_device() {
        let opens = Arc::new(AtomicUsize::new(0));
        let (sink, rx) = display_channel();
        let state = Arc::new(Mutex::new(WorkerState::Idle));
        let mut ctx = WorkerContext {
            spec: WorkerSpec {
                device: DeviceRef::Index(0),
                provider: Arc::new(CountingOpens(Arc::clone(&opens))),
                adapter: shared(Echo),
                config: CaptureConfig::default(),
                leases: DeviceLeases::new(),
            },
            publisher: sink.claim(),
            stop: Arc::new(AtomicBool::new(true)),
            state: Arc::clone(&state),
        };

        run(&mut ctx);

        assert_eq!(opens.load(Ordering::SeqCst), 0);
        assert_eq!(*state.lock().unwrap(), WorkerState::Stopped);
        let states: Vec<_> = rx
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                WorkerEvent::StateChanged { state, .. } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![WorkerState::Stopped]);
    }
}
