//! Periodic state re-assertion, decoupled from event triggers.
//!
//! Two timers keep the hub's picture fresh: the machine sensor re-publishes
//! its last known enabled/disabled value so the hub-side expiry window never
//! lapses on a missed event, and the presence sensor re-polls the status log
//! for a new token. The timers themselves never evaluate gates — gating is
//! re-evaluated inside the pipeline call each tick triggers.

use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{pipeline::Sensor, presence};

/// Resync interval for the machine sensor: half the expiry window, at least
/// one second. Expiry of one second or less means never expire, and the
/// timer is disabled — this is also the documented fallback when the
/// configured expiry fails to parse.
pub fn binary_resync_interval(expire_after: i64) -> Option<Duration> {
    if expire_after > 1 {
        Some(Duration::from_secs((expire_after / 2).max(1) as u64))
    } else {
        None
    }
}

/// Poll interval for the presence sensor; non-positive values disable
/// polling rather than aborting startup.
pub fn presence_poll_interval(polling_interval: i64) -> Option<Duration> {
    (polling_interval > 0).then(|| Duration::from_secs(polling_interval as u64))
}

/// Owns the background resync tasks for all sensors.
pub struct ResyncScheduler {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl ResyncScheduler {
    /// Creates a scheduler whose tasks stop when `cancel` fires.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            handles: Vec::new(),
        }
    }

    /// Spawns the last-state re-publish loop for a sensor.
    pub fn spawn_state_resync(&mut self, sensor: Arc<Mutex<Sensor>>, interval: Duration) {
        let cancel = self.cancel.clone();
        self.handles.push(tokio::spawn(async move {
            debug!(interval_secs = interval.as_secs_f64(), "State resync timer started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(interval) => {}
                }
                let mut sensor = sensor.lock().await;
                sensor.resend_state(&cancel).await;
            }
            debug!("State resync timer stopped");
        }));
    }

    /// Spawns the presence polling loop.
    ///
    /// Each tick re-reads the log tail off the async threads, then publishes
    /// the derived token — but only once the sensor has completed at least
    /// one successful registration; before that the hub would ignore the
    /// state anyway.
    pub fn spawn_presence_poll(
        &mut self,
        sensor: Arc<Mutex<Sensor>>,
        log_path: PathBuf,
        interval: Duration,
    ) {
        let cancel = self.cancel.clone();
        self.handles.push(tokio::spawn(async move {
            debug!(
                interval_secs = interval.as_secs_f64(),
                log = %log_path.display(),
                "Presence poll timer started"
            );
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(interval) => {}
                }

                let path = log_path.clone();
                let token =
                    match tokio::task::spawn_blocking(move || presence::extract_latest(&path))
                        .await
                    {
                        Ok(token) => token,
                        Err(e) => {
                            warn!("Presence scan task failed: {e}");
                            continue;
                        }
                    };

                let mut sensor = sensor.lock().await;
                if !sensor.is_registered() {
                    debug!("Presence sensor not yet registered, skipping poll publish");
                    continue;
                }
                sensor.publish_state(&token, &cancel).await;
            }
            debug!("Presence poll timer stopped");
        }));
    }

    /// Waits for all timer tasks to finish; call after cancelling.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// One immediate presence poll, used at startup before the timer takes over.
///
/// Unlike the periodic ticks this publishes unconditionally — it is the
/// publish that performs the sensor's first registration.
pub async fn poll_presence_once(
    sensor: &Arc<Mutex<Sensor>>,
    log_path: &std::path::Path,
    cancel: &CancellationToken,
) -> bool {
    let path = log_path.to_path_buf();
    let token = match tokio::task::spawn_blocking(move || presence::extract_latest(&path)).await {
        Ok(token) => token,
        Err(e) => {
            warn!("Presence scan task failed: {e}");
            return false;
        }
    };
    sensor.lock().await.publish_state(&token, cancel).await
}
