//! Worker → UI hand-off.
//!
//! Frames travel through a single latest-wins slot: the UI only ever wants the
//! newest pair, so a slow consumer silently skips frames instead of building
//! up a queue. Status text and state changes go through an unbounded channel
//! and are never dropped.
//!
//! Each worker publishes through a [`Publisher`] bound to a generation. Claiming
//! a new publisher bumps the generation and clears the slot, after which the
//! old publisher's frames are refused.

use crate::WorkerState;
use crossbeam_channel::{unbounded, Receiver, Sender};
use detview_camera::{DeviceRef, Frame};
use detview_detect::Detection;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Raw and annotated copies of one captured frame, published as a unit.
#[derive(Debug, Clone)]
pub struct FramePair {
    pub generation: u64,
    pub raw: Frame,
    pub annotated: Frame,
    pub detections: Vec<Detection>,
}

impl FramePair {
    pub fn seq(&self) -> u64 {
        self.raw.seq()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Status { generation: u64, message: String },
    StateChanged { generation: u64, device: DeviceRef, state: WorkerState },
}

impl WorkerEvent {
    pub fn generation(&self) -> u64 {
        match self {
            WorkerEvent::Status { generation, .. } | WorkerEvent::StateChanged { generation, .. } => *generation,
        }
    }
}

struct Slot {
    generation: u64,
    latest: Option<FramePair>,
}

struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
    published: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn display_channel() -> (DisplaySink, DisplayReceiver) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot { generation: 0, latest: None }),
        ready: Condvar::new(),
        published: AtomicU64::new(0),
    });
    let (tx, rx) = unbounded();
    (
        DisplaySink { shared: Arc::clone(&shared), events: tx },
        DisplayReceiver { shared, events: rx },
    )
}

/// Producer side; hands out one [`Publisher`] per worker.
#[derive(Clone)]
pub struct DisplaySink {
    shared: Arc<Shared>,
    events: Sender<WorkerEvent>,
}

impl DisplaySink {
    /// Start a new generation. Any pair still sitting in the slot belongs to
    /// the previous one and is discarded.
    pub fn claim(&self) -> Publisher {
        let mut slot = self.shared.lock();
        slot.generation += 1;
        slot.latest = None;
        Publisher {
            generation: slot.generation,
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.shared.lock().generation
    }
}

pub struct Publisher {
    generation: u64,
    shared: Arc<Shared>,
    events: Sender<WorkerEvent>,
}

impl Publisher {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.shared.lock().generation == self.generation
    }

    /// Replace whatever sits in the slot. Returns `false` without touching
    /// the slot once a newer generation has been claimed.
    pub fn publish(&self, raw: Frame, annotated: Frame, detections: Vec<Detection>) -> bool {
        let mut slot = self.shared.lock();
        if slot.generation != self.generation {
            return false;
        }
        slot.latest = Some(FramePair { generation: self.generation, raw, annotated, detections });
        self.shared.published.fetch_add(1, Ordering::Relaxed);
        drop(slot);
        self.shared.ready.notify_all();
        true
    }

    pub fn status(&self, message: impl Into<String>) {
        // the receiver may already be gone during shutdown
        let _ = self.events.send(WorkerEvent::Status { generation: self.generation, message: message.into() });
    }

    pub fn state(&self, device: &DeviceRef, state: WorkerState) {
        let _ = self.events.send(WorkerEvent::StateChanged {
            generation: self.generation,
            device: device.clone(),
            state,
        });
    }
}

/// Consumer side, owned by the UI thread.
pub struct DisplayReceiver {
    shared: Arc<Shared>,
    events: Receiver<WorkerEvent>,
}

impl DisplayReceiver {
    pub fn take_latest(&self) -> Option<FramePair> {
        self.shared.lock().latest.take()
    }

    /// Block up to `timeout` for a pair.
    pub fn wait_latest(&self, timeout: Duration) -> Option<FramePair> {
        let slot = self.shared.lock();
        let (mut slot, _) = self
            .shared
            .ready
            .wait_timeout_while(slot, timeout, |s| s.latest.is_none())
            .unwrap_or_else(|e| e.into_inner());
        slot.latest.take()
    }

    pub fn drain_events(&self) -> Vec<WorkerEvent> {
        self.events.try_iter().collect()
    }

    /// Total pairs accepted into the slot, including ones never taken.
    pub fn frames_published(&self) -> u64 {
        self.shared.published.load(Ordering::Relaxed)
    }

    pub fn current_generation(&self) -> u64 {
        self.shared.lock().generation
    }
}
