//! Presence derivation from an appended status log.
//!
//! The scanner yields log lines newest-first without reading the whole file;
//! the extractor applies the status pattern to that stream and reduces it to
//! a single presence token.

pub mod extractor;
pub mod reverse;

pub use extractor::{extract_latest, NO_DATA};
pub use reverse::ReverseLineScanner;
