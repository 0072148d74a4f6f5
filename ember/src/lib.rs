//! ember - Rust implementation of the Ember+ protocol
//!
//! Ember+ controls broadcast devices through a tree of nodes and
//! parameters. Documents are BER encoded Glow trees carried by S101 frames
//! over TCP or serial links.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `ember-core`: Error type, values and object identifiers
//! - `ember-ber`: BER tags, lengths, value codec and the streaming reader
//! - `ember-dom`: Tree model, node factories and the tree reader
//! - `ember-glow`: Glow types, builders and path addressing
//! - `ember-s101`: S101 framing, fragmentation and keep-alive handling
//!
//! [`EmberStream`] joins framing and tree decoding for one byte stream.
//!
//! # Usage
//!
//! ```rust
//! use ember::glow::{make_path, resolve_parameter, tags, GlowBuilder, GlowElement};
//! use ember::dom::Tree;
//! use ember::{EmberStream, Value};
//!
//! let mut tree = Tree::new();
//! let mut builder = GlowBuilder::new(&mut tree);
//! let root = builder.root();
//! let gain = builder.parameter(1).unwrap();
//! builder.set_contents_property(gain, tags::parameter::VALUE, Value::Integer(42)).unwrap();
//! builder.add_element(root, gain).unwrap();
//! let path = make_path(&tree, gain).unwrap();
//!
//! let mut provider = EmberStream::default();
//! let bytes = provider.encode_tree(&mut tree, root).unwrap();
//!
//! let mut consumer = EmberStream::default();
//! let decoded = consumer.feed(&bytes).remove(0).unwrap();
//! let found = resolve_parameter(&decoded.tree, decoded.root, &path).unwrap();
//! let value = GlowElement::new(&decoded.tree, found).unwrap().value().cloned();
//! assert_eq!(value, Some(Value::Integer(42)));
//! ```

pub mod stream;

pub use ember_core::{EmberError, EmberResult, ObjectIdentifier, Value, ValueType};
pub use stream::EmberStream;

// Re-export the BER codec
pub mod ber {
    pub use ember_ber::*;
}

// Re-export the tree model
pub mod dom {
    pub use ember_dom::*;
}

// Re-export the Glow schema
pub mod glow {
    pub use ember_glow::*;
}

// Re-export the framing layer
pub mod s101 {
    pub use ember_s101::*;
}
