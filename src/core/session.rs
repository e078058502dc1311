//! Session events and the serialized sensor engine.
//!
//! The operating-system shell (the excluded collaborator) observes session
//! switches and feeds them to the engine over a channel. The engine consumes
//! them one at a time: each event's publish — including its whole retry loop
//! — completes before the next event is processed, so the per-sensor
//! registration flag and last-state value are never mutated concurrently and
//! messages go out in event order.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch, Mutex},
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{helper::AmbienceHelper, pipeline::Sensor};

/// A session switch observed by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Logon,
    Logoff,
    Lock,
    Unlock,
}

impl SessionEvent {
    /// The (enabled, reason) pair this event publishes.
    pub fn state_change(&self) -> (bool, &'static str) {
        match self {
            SessionEvent::Logon => (true, "Logged On"),
            SessionEvent::Logoff => (false, "Logged Off"),
            SessionEvent::Lock => (false, "Locked"),
            SessionEvent::Unlock => (true, "Unlocked"),
        }
    }
}

/// Wall-clock bound on the final shutdown publish; teardown proceeds when it
/// elapses whether or not the broker answered.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Drives the machine sensor from session events.
pub struct Engine {
    machine: Arc<Mutex<Sensor>>,
    helper: Option<AmbienceHelper>,
    status_tx: watch::Sender<String>,
    cancel: CancellationToken,
    shutdown_grace: Duration,
}

impl Engine {
    /// Creates the engine plus the status channel the shell renders as a
    /// tooltip. The status carries the most recent reason string.
    pub fn new(
        machine: Arc<Mutex<Sensor>>,
        helper: Option<AmbienceHelper>,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<String>) {
        let (status_tx, status_rx) = watch::channel(String::new());
        (
            Self {
                machine,
                helper,
                status_tx,
                cancel,
                shutdown_grace: SHUTDOWN_GRACE,
            },
            status_rx,
        )
    }

    #[cfg(test)]
    fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Publishes the startup state: enabled, available, helper resumed.
    pub async fn startup(&self) -> bool {
        let ok = self.apply(true, "Started").await;
        self.machine
            .lock()
            .await
            .publish_availability(true, &self.cancel)
            .await;
        ok
    }

    /// Consumes session events until the channel closes or shutdown fires.
    pub async fn run(&self, mut events: mpsc::Receiver<SessionEvent>) {
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            let (enabled, reason) = event.state_change();
            debug!(?event, enabled, "Session event");
            self.apply(enabled, reason).await;
        }
        debug!("Session event loop stopped");
    }

    /// Publishes one state change; on success, chains the ambience helper.
    pub async fn apply(&self, enabled: bool, reason: &str) -> bool {
        self.set_status(reason);
        let ok = self
            .machine
            .lock()
            .await
            .update_binary(enabled, &self.cancel)
            .await;
        if ok {
            if let Some(helper) = &self.helper {
                helper.run(enabled).await;
            }
        } else {
            info!(reason, "State publish did not go through");
        }
        ok
    }

    /// Best-effort final publish: disabled plus unavailable, bounded in
    /// time, then the ambience helper is suspended.
    ///
    /// Runs on a fresh token — the engine's own token has already fired by
    /// the time shutdown runs, and the farewell publish still deserves its
    /// bounded chance.
    pub async fn shutdown(&self) {
        self.set_status("Exited");
        let farewell = CancellationToken::new();
        let machine = self.machine.clone();

        let outcome = timeout(self.shutdown_grace, async {
            let mut sensor = machine.lock().await;
            sensor.update_binary(false, &farewell).await;
            sensor.publish_availability(false, &farewell).await;
        })
        .await;

        match outcome {
            Ok(()) => info!("Shutdown publish completed"),
            Err(_) => warn!("Shutdown publish timed out, proceeding with teardown"),
        }
        if let Some(helper) = &self.helper {
            helper.run(false).await;
        }
        farewell.cancel();
    }

    fn set_status(&self, reason: &str) {
        info!("Reason: {reason}");
        let _ = self.status_tx.send(reason.to_string());
    }
}
