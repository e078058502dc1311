//! hivesense-mqtt — one-shot WebSocket broker transport.
//!
//! This crate owns the wire side of hivesense's publishing: building an MQTT
//! client for a `ws://` broker endpoint, delivering a small batch of messages
//! over a single short-lived connection, and mapping every failure into the
//! unified [`TransferError`].
//!
//! The deliberate absence of a persistent session is the point: the sensor
//! pipeline re-evaluates its environment gates between attempts, so each
//! attempt gets a fresh connect/publish/disconnect round trip and there is no
//! connection lifecycle to share or repair.

pub mod client;
pub mod error;
pub mod message;
pub mod transport;

pub use client::LinkBuilder;
pub use error::TransferError;
pub use message::AppMessage;
pub use transport::{BrokerSettings, OneShotTransport};
