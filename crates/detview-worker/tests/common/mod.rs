#![allow(dead_code)]

use detview_camera::{
    Backend, CameraError, CaptureConfig, CaptureProvider, DeviceRef, Frame, FrameRead, FrameSource,
};
use detview_detect::{DetectError, Inference, InferenceAdapter};
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// What a scripted source does once its frames run out.
#[derive(Clone, Copy, Debug)]
pub enum Ending {
    EndOfStream,
    ReadFailure,
    Endless,
}

#[derive(Default)]
pub struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub open_now: AtomicUsize,
    pub high_water: AtomicUsize,
    pub opens: Mutex<Vec<DeviceRef>>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
    pub fn opens_of(&self, device: &DeviceRef) -> usize {
        self.opens.lock().unwrap().iter().filter(|d| *d == device).count()
    }
}

pub struct Scripted {
    pub frames: u64,
    pub ending: Ending,
    pub fail_open: bool,
    pub delay: Duration,
    pub counters: Arc<Counters>,
}

impl Scripted {
    pub fn new(frames: u64, ending: Ending) -> Self {
        Self { frames, ending, fail_open: false, delay: Duration::ZERO, counters: Arc::default() }
    }

    pub fn unavailable() -> Self {
        Self { fail_open: true, ..Self::new(0, Ending::EndOfStream) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl CaptureProvider for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn backends(&self) -> Vec<Backend> {
        vec![Backend::MediaFoundation, Backend::Any]
    }

    fn open_with(
        &self,
        device: &DeviceRef,
        backend: Backend,
        _config: &CaptureConfig,
    ) -> detview_camera::Result<Box<dyn FrameSource>> {
        if self.fail_open {
            return Err(CameraError::UnsupportedBackend { device: device.clone(), backend });
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        self.counters.opens.lock().unwrap().push(device.clone());
        let now = self.counters.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.high_water.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(ScriptedSource {
            device: device.clone(),
            backend,
            seq: 0,
            frames: self.frames,
            ending: self.ending,
            delay: self.delay,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct ScriptedSource {
    device: DeviceRef,
    backend: Backend,
    seq: u64,
    frames: u64,
    ending: Ending,
    delay: Duration,
    counters: Arc<Counters>,
}

impl FrameSource for ScriptedSource {
    fn device(&self) -> &DeviceRef {
        &self.device
    }

    fn backend(&self) -> Backend {
        self.backend
    }

    fn read_frame(&mut self) -> detview_camera::Result<FrameRead> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.seq >= self.frames {
            match self.ending {
                Ending::EndOfStream => return Ok(FrameRead::EndOfStream),
                Ending::ReadFailure => {
                    return Err(CameraError::ReadFailure { device: self.device.clone(), reason: "unplugged".into() })
                }
                Ending::Endless => {}
            }
        }
        let shade = (self.seq % 256) as u8;
        let frame = Frame::new(self.seq, self.delay * self.seq as u32, RgbImage::from_pixel(4, 4, Rgb([shade; 3])));
        self.seq += 1;
        Ok(FrameRead::Frame(frame))
    }

    fn close(self: Box<Self>) {
        self.counters.open_now.fetch_sub(1, Ordering::SeqCst);
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Adapter that records every sequence number it sees and inverts pixels.
#[derive(Clone, Default)]
pub struct Recording {
    pub seen: Arc<Mutex<Vec<u64>>>,
    pub fail_at: Option<u64>,
    pub panic_at: Option<u64>,
}

impl InferenceAdapter for Recording {
    fn infer(&mut self, frame: &Frame) -> detview_detect::Result<Inference> {
        if self.fail_at == Some(frame.seq()) {
            return Err(DetectError::Inference("model exploded".into()));
        }
        if self.panic_at == Some(frame.seq()) {
            panic!("tensor shape mismatch");
        }
        self.seen.lock().unwrap().push(frame.seq());
        let mut img = frame.image().clone();
        image::imageops::invert(&mut img);
        Ok(Inference { annotated: frame.derive(img), detections: Vec::new() })
    }
}

pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
