//! One-shot broker delivery.
//!
//! `OneShotTransport` performs one complete connect → publish batch →
//! disconnect round trip per call. Nothing is held open between calls: the
//! environment gates and registration state can change between attempts, and
//! a short-lived connection keeps failure recovery trivial — there is no
//! session to repair, the next attempt simply starts from scratch.
//!
//! Each delivery is bounded by a per-attempt timeout and by the caller's
//! cancellation token, so shutdown never hangs on an unreachable broker.

use std::time::Duration;

use rumqttc::{Event, Outgoing, QoS};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{client::LinkBuilder, error::TransferError, message::AppMessage};

/// Default wall-clock budget for one connect/publish/disconnect round trip.
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a broker reached over WebSocket.
#[derive(Debug, Clone, Default)]
pub struct BrokerSettings {
    /// Full `ws://` endpoint of the broker's WebSocket listener.
    pub uri: String,

    /// Username for the CONNECT packet; empty means anonymous.
    pub username: String,

    /// Password for the CONNECT packet.
    pub password: String,
}

/// Delivers message batches over short-lived broker connections.
///
/// The settings are captured once at construction; every `deliver` call
/// builds a fresh client from them.
#[derive(Debug, Clone)]
pub struct OneShotTransport {
    settings: BrokerSettings,
    attempt_timeout: Duration,
}

impl OneShotTransport {
    /// Creates a transport with the default per-attempt timeout.
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Overrides the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Delivers all messages over one fresh connection.
    ///
    /// Opens a connection, authenticates, queues every message at
    /// at-most-once QoS, requests a disconnect, and drives the event loop
    /// until the disconnect goes out on the wire. The first connection error
    /// aborts the whole batch — partial delivery is reported as failure and
    /// the caller retries the batch.
    ///
    /// # Errors
    /// - `TransferError::Endpoint` / `ClientSetup`: configuration problems.
    /// - `TransferError::ClientTransfer` / `ClientConnection`: queueing or
    ///   network failure.
    /// - `TransferError::Timeout`: the round trip exceeded the budget.
    /// - `TransferError::Cancelled`: shutdown was requested mid-delivery.
    pub async fn deliver(
        &self,
        messages: &[AppMessage],
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let (client, mut event_loop) = LinkBuilder::websocket("", &self.settings.uri)?
            .credentials(&self.settings.username, &self.settings.password)
            .build();

        let round_trip = async {
            for message in messages {
                trace!(topic = %message.topic, retain = message.retain, "Queueing publish");
                client
                    .publish(
                        message.topic.as_str(),
                        QoS::AtMostOnce,
                        message.retain,
                        message.payload.clone().into_bytes(),
                    )
                    .await?;
            }
            client.disconnect().await?;

            // Drive the connection until the disconnect is flushed. Any error
            // before that point fails the batch; rumqttc would otherwise
            // retry internally, but retrying is the pipeline's job.
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                        debug!(count = messages.len(), "Delivered batch and disconnected");
                        return Ok(());
                    }
                    Ok(event) => trace!(?event, "Broker event"),
                    Err(e) => return Err(TransferError::from(e)),
                }
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(TransferError::Cancelled),
            outcome = tokio::time::timeout(self.attempt_timeout, round_trip) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(TransferError::Timeout(self.attempt_timeout)),
                }
            }
        }
    }
}
