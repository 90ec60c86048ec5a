//! rv-core: shared error type, per-stream media values, and reconciliation
//! configuration.
//!
//! This crate is the foundational dependency for the other rv-* crates,
//! providing the unified error type, the paired video/audio value types used
//! by segment records, and the knobs that tune a reconciliation run.

pub mod config;
pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use config::{AlignKey, GapPolicy, ReconcileConfig};
pub use error::{Error, Result};
pub use media::*;
