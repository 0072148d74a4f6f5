//! Tree model for Ember+ documents
//!
//! A [`Tree`] is an arena of BER nodes. Leaves hold a [`Value`](ember_core::Value)
//! under an explicit outer tag; containers hold an ordered list of children
//! under an outer tag and a type tag.
//!
//! ```text
//! App0 (Root)
//! └── ctx0 / App1 (Parameter)
//!     ├── ctx0  INTEGER 1          number
//!     └── ctx1 / SET               contents
//!         └── ctx2  INTEGER 42     value
//! ```
//!
//! Mutations mark the changed node and every ancestor dirty. Encoding
//! refreshes the cached lengths of dirty nodes first, so the root always
//! encodes every unflushed change.
//!
//! [`DomReader`] materializes trees from a byte stream through a
//! [`FactoryRegistry`].

pub mod error;
pub mod node;
pub mod tree;
pub mod factory;
pub mod reader;

pub use error::{EmberError, EmberResult};
pub use node::{ContainerKind, NodeId, NodeKind, PropertyFlags};
pub use tree::{Observer, Tree};
pub use factory::{FactoryRegistry, NodeFactory};
pub use reader::{decode_tree, DecodedTree, DomReader, TreeBuilder};
