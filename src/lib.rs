//! hivesense — gated machine/user presence publisher for a home-automation hub
//!
//! This crate publishes the state of a workstation (enabled/disabled around
//! session events) and the logged-in user's presence (derived from a status
//! log) to an MQTT broker, in the discovery format a home-automation hub
//! auto-configures from. Publishing is gated on environmental preconditions
//! and kept fresh by periodic resynchronization.
//!
//! ## Modules
//!
//! * `config` — Configuration structures, loading, validation, and defaults.
//!   Supports TOML configuration files with validation via the `validator`
//!   crate.
//!
//! * `core` — Core runtime components:
//!   - Sensor identity and discovery payloads
//!   - Environmental gating over live system probes
//!   - The gated, bounded-retry publish pipeline
//!   - Reverse log scanning and presence extraction
//!   - Periodic resync timers and the session-driven engine
//!
//! * `logger` — Centralized logging initialization using `tracing`.
//!   Supports console output in multiple formats (compact, pretty, JSON)
//!   and optional systemd journald integration.
//!
//! The broker wire transport lives in the `hivesense-mqtt` crate; the core
//! reaches it through the `BrokerLink` trait so tests can swap in an
//! in-memory recorder.

pub mod config;
pub mod core;
pub mod logger;
