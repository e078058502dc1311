//! Error handling for broker transfer operations.
//!
//! `TransferError` is the unified error type for everything the transport
//! crate does: endpoint parsing, client setup, queuing publishes, and driving
//! the connection to completion. Application code treats most variants as
//! transient — the publish pipeline converts them into a failed attempt and
//! retries — while `Endpoint` and `ClientSetup` indicate configuration
//! problems that will fail every attempt until fixed.

use std::time::Duration;

use thiserror::Error;

/// The unified error type for broker transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The broker endpoint URI is missing, malformed, or uses an unsupported
    /// scheme. Only `ws://` endpoints are accepted.
    #[error("Broker endpoint error: {0}")]
    Endpoint(String),

    /// Client initialization failed before any network activity.
    #[error("Client setup error: {0}")]
    ClientSetup(String),

    /// The local client could not queue a packet (channel closed or full).
    #[error("Client transfer error: {0}")]
    ClientTransfer(#[from] rumqttc::ClientError),

    /// The connection to the broker failed or was lost mid-delivery.
    ///
    /// Boxed to keep the enum small; rumqttc's connection error is large.
    #[error("Client connection error: {0}")]
    ClientConnection(#[from] Box<rumqttc::ConnectionError>),

    /// The whole connect/publish/disconnect round trip did not finish within
    /// the configured per-attempt budget.
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    /// Delivery was abandoned because shutdown was requested.
    #[error("Delivery cancelled")]
    Cancelled,
}

/// Boxes rumqttc's `ConnectionError` so the `?` operator works without
/// bloating `TransferError`.
impl From<rumqttc::ConnectionError> for TransferError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        TransferError::ClientConnection(Box::new(err))
    }
}
