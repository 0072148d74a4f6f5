//! Error types for the Glow layer

pub use ember_core::error::{EmberError, EmberResult};
