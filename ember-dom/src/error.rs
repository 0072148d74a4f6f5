//! Error types for the tree model

pub use ember_core::error::{EmberError, EmberResult};
