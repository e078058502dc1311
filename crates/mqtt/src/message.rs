//! Broker message types.
//!
//! An `AppMessage` is one logical publish: a concrete topic, a UTF-8 payload,
//! and a retain flag. Sensor code builds small batches of these (a discovery
//! record, a state value, an availability value) and hands them to the
//! transport, which delivers the whole batch over a single short-lived
//! connection.

/// A single application-level message bound for the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMessage {
    /// Full topic string (no wildcard characters).
    pub topic: String,

    /// UTF-8 payload.
    pub payload: String,

    /// Whether the broker should retain the message for late subscribers.
    /// Discovery records are retained; state and availability are not.
    pub retain: bool,
}

impl AppMessage {
    /// Creates a non-retained message.
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: false,
        }
    }

    /// Creates a retained message.
    pub fn retained(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retain: true,
        }
    }
}
