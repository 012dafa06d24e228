//! Domain models for solgate.
//!
//! These are the persisted and wire-level types shared across all
//! crates.

pub mod custom_field;
pub mod handshake;
pub mod solution;
