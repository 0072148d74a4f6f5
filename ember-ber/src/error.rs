//! Error types re-exported from ember-core

pub use ember_core::error::{EmberError, EmberResult};
