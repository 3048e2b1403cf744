//! Session-level tests.
//!
//! - `determinism.rs`: same seed and inputs give the same states and events
//! - `integration.rs`: full ticks through the session, from input to audio
//! - `helpers.rs`: field layouts and session setup

mod helpers;
mod integration;

pub use helpers::*;
