//! recverify - reconciliation of redundant live-recording captures
//!
//! This library crate exposes the batch runner, configuration loading and
//! report rendering used by the binary, for integration testing.

pub mod batch;
pub mod config;
pub mod output;
