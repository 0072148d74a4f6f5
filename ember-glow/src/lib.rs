//! Glow, the Ember+ application schema
//!
//! Glow elements are application-typed containers of context-tagged
//! properties:
//!
//! ```text
//! Parameter ::= [APPLICATION 1] SEQUENCE {
//!     number    [0] Integer32,
//!     contents  [1] ParameterContents OPTIONAL,   -- SET of properties
//!     children  [2] ElementCollection OPTIONAL
//! }
//! ```
//!
//! This crate provides the application type table, the property tags used
//! by the builders, a [`FactoryRegistry`](ember_dom::FactoryRegistry)
//! preloaded with every Glow type, and path-based addressing.

pub mod error;
pub mod types;
pub mod tags;
pub mod registry;
pub mod builder;
pub mod element;
pub mod addressing;

pub use error::{EmberError, EmberResult};
pub use types::{CommandType, FieldFlags, GlowType, ParameterAccess, ParameterType};
pub use registry::glow_registry;
pub use builder::GlowBuilder;
pub use element::GlowElement;
pub use addressing::{make_path, qualify, resolve, resolve_parameter};
