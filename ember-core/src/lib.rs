//! Core types and utilities for the Ember+ protocol
//!
//! This crate provides the error type, object identifiers and the value
//! sum type shared by the BER codec, the tree model and the framing layer.

pub mod error;
pub mod oid;
pub mod datatypes;

pub use error::{EmberError, EmberResult};
pub use oid::ObjectIdentifier;
pub use datatypes::{FromValue, Value, ValueType};
