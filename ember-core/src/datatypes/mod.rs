//! Data types carried by Ember+ leaves

pub mod value;

pub use value::{FromValue, Value, ValueType};
