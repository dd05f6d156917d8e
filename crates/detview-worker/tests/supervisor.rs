mod common;

use common::{wait_until, Ending, Recording, Scripted};
use detview_camera::{CaptureConfig, DeviceRef};
use detview_detect::shared;
use detview_worker::{display_channel, CameraManager, Supervisor, WorkerError, WorkerState};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn endless() -> Arc<Scripted> {
    Arc::new(Scripted::new(0, Ending::Endless).with_delay(Duration::from_millis(1)))
}

#[test]
fn switching_never_overlaps_sources() -> anyhow::Result<()> {
    let provider = endless();
    let (sink, rx) = display_channel();
    let mut supervisor = Supervisor::new(
        Arc::clone(&provider) as _,
        shared(Recording::default()),
        CaptureConfig::default(),
        sink,
    );

    for index in [0, 1, 0, 2] {
        supervisor.start(DeviceRef::Index(index))?;
        let published = rx.frames_published();
        assert!(wait_until(Duration::from_secs(5), || rx.frames_published() > published + 2));
        assert_eq!(supervisor.state(), Some(WorkerState::Running));
    }
    assert_eq!(provider.counters.high_water(), 1);
    assert_eq!(provider.counters.opened(), 4);
    assert_eq!(provider.counters.closed(), 3);

    // whatever sits in the slot belongs to the current worker
    let pair = rx.wait_latest(Duration::from_secs(5)).expect("current worker keeps publishing");
    assert_eq!(Some(pair.generation), supervisor.generation());
    assert_eq!(supervisor.device(), Some(&DeviceRef::Index(2)));

    supervisor.shutdown();
    assert_eq!(provider.counters.closed(), 4);
    assert_eq!(supervisor.state(), None);
    Ok(())
}

#[test]
fn switch_returns_while_a_read_is_in_flight() -> anyhow::Result<()> {
    let provider = Arc::new(Scripted::new(0, Ending::Endless).with_delay(Duration::from_millis(400)));
    let (sink, rx) = display_channel();
    let mut supervisor =
        Supervisor::new(Arc::clone(&provider) as _, shared(Recording::default()), CaptureConfig::default(), sink);

    supervisor.start(DeviceRef::Index(0))?;
    assert!(wait_until(Duration::from_secs(5), || rx.frames_published() > 0));

    let began = Instant::now();
    supervisor.start(DeviceRef::Index(1))?;
    assert!(began.elapsed() < Duration::from_millis(200), "switch blocked for {:?}", began.elapsed());

    let pair = rx.wait_latest(Duration::from_secs(5)).expect("new camera publishes");
    assert_eq!(Some(pair.generation), supervisor.generation());
    assert_eq!(provider.counters.high_water(), 1);

    supervisor.shutdown();
    assert_eq!(provider.counters.opened(), provider.counters.closed());
    Ok(())
}

#[test]
fn enumerating_while_running_leaves_the_active_camera_alone() -> anyhow::Result<()> {
    let provider = endless();
    let (sink, rx) = display_channel();
    let mut supervisor =
        Supervisor::new(Arc::clone(&provider) as _, shared(Recording::default()), CaptureConfig::default(), sink);

    supervisor.start(DeviceRef::Index(0))?;
    assert!(wait_until(Duration::from_secs(5), || rx.frames_published() > 0));

    assert_eq!(supervisor.enumerate(3), vec![0, 1, 2]);
    assert_eq!(provider.counters.opens_of(&DeviceRef::Index(0)), 1);
    assert_eq!(provider.counters.opens_of(&DeviceRef::Index(1)), 1);
    assert_eq!(supervisor.state(), Some(WorkerState::Running));
    // only the worker's lease is left
    assert_eq!(supervisor.leases().len(), 1);
    Ok(())
}

#[test]
fn stop_keeps_final_state_visible() -> anyhow::Result<()> {
    let provider = endless();
    let (sink, rx) = display_channel();
    let mut supervisor =
        Supervisor::new(Arc::clone(&provider) as _, shared(Recording::default()), CaptureConfig::default(), sink);

    supervisor.start(DeviceRef::Index(0))?;
    assert!(wait_until(Duration::from_secs(5), || rx.frames_published() > 0));
    supervisor.stop();
    assert!(wait_until(Duration::from_secs(5), || supervisor.state() == Some(WorkerState::Stopped)));
    assert!(!supervisor.is_active());
    assert!(rx.drain_events().iter().any(|e| matches!(
        e,
        detview_worker::WorkerEvent::Status { message, .. } if message == "camera 0 stopped"
    )));
    Ok(())
}

#[test]
fn dropping_supervisor_releases_device() -> anyhow::Result<()> {
    let provider = endless();
    let (sink, rx) = display_channel();
    {
        let mut supervisor =
            Supervisor::new(Arc::clone(&provider) as _, shared(Recording::default()), CaptureConfig::default(), sink);
        supervisor.start(DeviceRef::Index(0))?;
        assert!(wait_until(Duration::from_secs(5), || rx.frames_published() > 0));
    }
    assert_eq!(provider.counters.closed(), 1);
    Ok(())
}

#[test]
fn manager_runs_cameras_independently() -> anyhow::Result<()> {
    let provider = endless();
    let mut manager =
        CameraManager::new(Arc::clone(&provider) as _, shared(Recording::default()), CaptureConfig::default());

    manager.start(DeviceRef::Index(0))?;
    manager.start(DeviceRef::Index(1))?;
    let again = manager.start(DeviceRef::Index(0));
    assert!(matches!(again, Err(WorkerError::AlreadyActive(DeviceRef::Index(0)))));

    for index in [0, 1] {
        let rx = manager.receiver(&DeviceRef::Index(index)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || rx.frames_published() > 2));
    }
    assert_eq!(manager.active_count(), 2);

    assert!(manager.stop(&DeviceRef::Index(0)));
    assert_eq!(manager.state(&DeviceRef::Index(0)), Some(WorkerState::Stopped));
    assert_eq!(manager.state(&DeviceRef::Index(1)), Some(WorkerState::Running));
    assert!(!manager.stop(&DeviceRef::Index(9)));

    // a stopped device can be started again
    manager.start(DeviceRef::Index(0))?;
    manager.stop_all();
    assert_eq!(manager.active_count(), 0);
    assert_eq!(provider.counters.opened(), provider.counters.closed());
    Ok(())
}
