//! Core runtime components: sensor identity, environmental gating, the
//! gated publish pipeline, presence derivation, periodic resync, and the
//! session-driven engine.

pub mod env;
pub mod gate;
pub mod helper;
pub mod pipeline;
pub mod presence;
pub mod resync;
pub mod sensor;
pub mod session;
