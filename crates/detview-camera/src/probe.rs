use crate::{CameraError, CaptureConfig, CaptureProvider, DeviceLeases, DeviceRef};

/// Default number of indices tried by [`probe_devices`].
pub const DEFAULT_PROBE_LIMIT: u32 = 10;

/// Test-open cameras `0..limit` and collect the indices that opened.
///
/// Stops at the first index that fails, so the result is always a prefix
/// `0..n`. Every probe handle is closed before the next index is tried.
///
/// Each probe holds the device lease while its handle is open. An index
/// already leased by a worker counts as present and is never opened.
pub fn probe_devices<P>(provider: &P, limit: u32, config: &CaptureConfig, leases: &DeviceLeases) -> Vec<u32>
where
    P: CaptureProvider + ?Sized,
{
    let mut found = Vec::new();
    for index in 0..limit {
        let device = DeviceRef::Index(index);
        if !provider.accepts(&device) {
            break;
        }
        let _lease = match leases.acquire(&device) {
            Ok(lease) => lease,
            Err(CameraError::DeviceBusy(_)) => {
                log::debug!("{device} is in use, counted without probing");
                found.push(index);
                continue;
            }
            Err(err) => {
                log::debug!("probe stopped at {device}: {err}");
                break;
            }
        };
        match provider.open(&device, config) {
            Ok(source) => {
                source.close();
                found.push(index);
            }
            Err(err) => {
                log::debug!("probe stopped at {device}: {err}");
                break;
            }
        }
    }
    log::info!("{}: {} camera(s) found {:?}", provider.name(), found.len(), found);
    found
}
