//! Gated publish pipeline and registration lifecycle.
//!
//! [`Sensor`] is the single entry point for emitting a state change. Each
//! publish runs the same sequence: evaluate the environment gates, announce
//! the sensor to the hub if it has not been announced yet, then deliver the
//! batch over a fresh broker connection. Any failure at any step consumes one
//! attempt; attempts are spaced by a fixed delay and capped, and the outcome
//! collapses to a boolean — nothing here propagates an error to callers.
//!
//! A sensor starts unregistered and becomes registered after one successful
//! discovery publish. It never reverts: once the hub has seen the retained
//! discovery record, the sensor trusts it for the life of the process.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    gate::{self, Environment},
    sensor::{binary_payload, SensorSpec},
};
use hivesense_mqtt::{AppMessage, OneShotTransport, TransferError};

/// Delivery seam between the pipeline and the broker wire.
///
/// The production implementation opens one short-lived connection per call;
/// tests substitute an in-memory recorder.
#[async_trait]
pub trait BrokerLink: Send + Sync {
    /// Delivers all messages or fails the whole batch.
    async fn deliver(
        &self,
        messages: &[AppMessage],
        cancel: &CancellationToken,
    ) -> Result<(), TransferError>;
}

#[async_trait]
impl BrokerLink for OneShotTransport {
    async fn deliver(
        &self,
        messages: &[AppMessage],
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        OneShotTransport::deliver(self, messages, cancel).await
    }
}

/// Attempt ceiling and spacing for one publish call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, counting gate-blocked ones.
    pub max_attempts: u32,

    /// Fixed wait between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

/// Mutable per-instance sensor state.
#[derive(Debug, Clone, Default)]
struct SensorState {
    /// Set after the first successful discovery publish; never cleared.
    is_registered: bool,

    /// Last attempted state payload, re-asserted by the resync timer.
    last_state: Option<String>,
}

/// One sensor instance: immutable spec plus registration/publish machinery.
///
/// Publishes for a single sensor must not interleave; callers own the
/// serialization (the engine wraps each sensor in an async mutex and consumes
/// triggers one at a time).
pub struct Sensor {
    spec: SensorSpec,
    state: SensorState,
    link: Arc<dyn BrokerLink>,
    env: Arc<dyn Environment>,
    retry: RetryPolicy,
}

impl Sensor {
    pub fn new(spec: SensorSpec, link: Arc<dyn BrokerLink>, env: Arc<dyn Environment>) -> Self {
        Self {
            spec,
            state: SensorState::default(),
            link,
            env,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy. Tests shrink the delay; production keeps
    /// the default.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn spec(&self) -> &SensorSpec {
        &self.spec
    }

    pub fn is_registered(&self) -> bool {
        self.state.is_registered
    }

    pub fn last_state(&self) -> Option<&str> {
        self.state.last_state.as_deref()
    }

    /// Publishes a binary enabled/disabled state.
    pub async fn update_binary(&mut self, enabled: bool, cancel: &CancellationToken) -> bool {
        self.publish_state(binary_payload(enabled), cancel).await
    }

    /// Publishes an arbitrary state token and records it for resync.
    pub async fn publish_state(&mut self, state: &str, cancel: &CancellationToken) -> bool {
        self.state.last_state = Some(state.to_string());
        let message = AppMessage::new(self.spec.state_topic(), state);
        self.publish(&[message], cancel).await
    }

    /// Re-asserts the last known state, if any. Called by the resync timer
    /// to keep the hub-side expiry window from lapsing on missed events.
    pub async fn resend_state(&mut self, cancel: &CancellationToken) -> bool {
        let Some(state) = self.state.last_state.clone() else {
            debug!(sensor = %self.spec.name, "No state to resend yet");
            return true;
        };
        let message = AppMessage::new(self.spec.state_topic(), state);
        self.publish(&[message], cancel).await
    }

    /// Publishes the availability value for this sensor.
    pub async fn publish_availability(&mut self, online: bool, cancel: &CancellationToken) -> bool {
        let payload = if online { "online" } else { "offline" };
        let message = AppMessage::new(self.spec.availability_topic(), payload);
        self.publish(&[message], cancel).await
    }

    /// Announces the sensor to the hub if it has not been announced yet.
    ///
    /// Registration itself is not gated — it is the precondition that gated
    /// publishing relies on. Idempotent: a registered sensor returns true
    /// without touching the broker.
    pub async fn ensure_registered(&mut self, cancel: &CancellationToken) -> bool {
        if self.state.is_registered {
            return true;
        }
        self.register(cancel).await
    }

    /// Runs the gated attempt loop for one batch.
    async fn publish(&mut self, messages: &[AppMessage], cancel: &CancellationToken) -> bool {
        for attempt in 1..=self.retry.max_attempts {
            if self.try_publish(messages, attempt, cancel).await {
                return true;
            }
            if attempt == self.retry.max_attempts {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(sensor = %self.spec.name, "Publish abandoned by shutdown");
                    return false;
                }
                _ = sleep(self.retry.delay) => {}
            }
        }

        warn!(
            sensor = %self.spec.name,
            attempts = self.retry.max_attempts,
            "Publish gave up"
        );
        false
    }

    /// One attempt: gates, registration, delivery.
    async fn try_publish(
        &mut self,
        messages: &[AppMessage],
        attempt: u32,
        cancel: &CancellationToken,
    ) -> bool {
        let status = gate::check(&self.spec.gates, self.env.as_ref()).await;
        if !status.is_eligible() {
            // Expected and transient; the next attempt re-reads the environment.
            info!(
                sensor = %self.spec.name,
                attempt,
                reason = status.reason(),
                "Publish gated"
            );
            return false;
        }

        if !self.state.is_registered && !self.register(cancel).await {
            return false;
        }

        match self.link.deliver(messages, cancel).await {
            Ok(()) => {
                debug!(sensor = %self.spec.name, attempt, "Publish delivered");
                true
            }
            Err(e) => {
                warn!(sensor = %self.spec.name, attempt, "Delivery failed: {e}");
                false
            }
        }
    }

    /// Publishes the retained discovery record over its own connection.
    async fn register(&mut self, cancel: &CancellationToken) -> bool {
        let payload = match serde_json::to_string(&self.spec.discovery_payload()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(sensor = %self.spec.name, "Discovery payload serialization failed: {e}");
                return false;
            }
        };
        let message = AppMessage::retained(self.spec.discovery_topic(), payload);

        match self.link.deliver(&[message], cancel).await {
            Ok(()) => {
                info!(sensor = %self.spec.name, "Registered with the hub");
                self.state.is_registered = true;
                true
            }
            Err(e) => {
                warn!(sensor = %self.spec.name, "Registration failed: {e}");
                false
            }
        }
    }
}
