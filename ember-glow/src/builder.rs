//! Helpers for building Glow documents in a [`Tree`]
//!
//! # Usage Example
//!
//! ```rust
//! use ember_dom::Tree;
//! use ember_glow::{tags, GlowBuilder};
//! use ember_core::Value;
//!
//! let mut tree = Tree::new();
//! let mut builder = GlowBuilder::new(&mut tree);
//! let root = builder.root();
//! let gain = builder.parameter(1).unwrap();
//! builder.set_contents_property(gain, tags::parameter::VALUE, Value::Integer(42)).unwrap();
//! builder.add_element(root, gain).unwrap();
//!
//! let bytes = tree.encode_to_vec(root).unwrap();
//! assert_eq!(bytes[0], 0x60);
//! ```

use crate::error::{EmberError, EmberResult};
use crate::tags;
use crate::types::{CommandType, FieldFlags, GlowType};
use ember_ber::Tag;
use ember_core::{ObjectIdentifier, Value};
use ember_dom::{ContainerKind, NodeId, Tree};

/// Builder borrowing a tree
pub struct GlowBuilder<'a> {
    tree: &'a mut Tree,
}

impl<'a> GlowBuilder<'a> {
    pub fn new(tree: &'a mut Tree) -> Self {
        Self { tree }
    }

    /// The underlying tree
    pub fn tree(&mut self) -> &mut Tree {
        &mut *self.tree
    }

    /// Create a root document (`Root` wrapping a `RootElementCollection`)
    pub fn root(&mut self) -> NodeId {
        self.tree.create_container(
            tags::ROOT,
            GlowType::RootElementCollection.tag(),
            ContainerKind::Sequence,
        )
    }

    /// Create a numbered element of the given type
    pub fn element(&mut self, glow_type: GlowType, number: u32) -> EmberResult<NodeId> {
        if !glow_type.is_element() || glow_type.is_qualified() {
            return Err(EmberError::InvalidData(format!(
                "{} is not a numbered element type",
                glow_type
            )));
        }
        let id = self.item(glow_type);
        let number = self
            .tree
            .create_leaf(tags::element::NUMBER, Value::Integer(i64::from(number)));
        self.tree.append(id, number)?;
        Ok(id)
    }

    /// Create a qualified element addressed by `path`
    pub fn qualified_element(&mut self, glow_type: GlowType, path: &ObjectIdentifier) -> EmberResult<NodeId> {
        if !glow_type.is_qualified() {
            return Err(EmberError::InvalidData(format!(
                "{} is not a qualified element type",
                glow_type
            )));
        }
        if path.is_empty() {
            return Err(EmberError::InvalidData("Qualified element with empty path".to_string()));
        }
        let id = self.item(glow_type);
        let path = self
            .tree
            .create_leaf(tags::element::PATH, Value::RelativeObjectIdentifier(path.clone()));
        self.tree.append(id, path)?;
        Ok(id)
    }

    pub fn node(&mut self, number: u32) -> EmberResult<NodeId> {
        self.element(GlowType::Node, number)
    }

    pub fn parameter(&mut self, number: u32) -> EmberResult<NodeId> {
        self.element(GlowType::Parameter, number)
    }

    pub fn qualified_node(&mut self, path: &ObjectIdentifier) -> EmberResult<NodeId> {
        self.qualified_element(GlowType::QualifiedNode, path)
    }

    pub fn qualified_parameter(&mut self, path: &ObjectIdentifier) -> EmberResult<NodeId> {
        self.qualified_element(GlowType::QualifiedParameter, path)
    }

    /// Create a command; `GetDirectory` asks for all fields
    pub fn command(&mut self, command: CommandType) -> EmberResult<NodeId> {
        match command {
            CommandType::GetDirectory => self.command_with_mask(command, FieldFlags::All),
            _ => {
                let id = self.item(GlowType::Command);
                let number = self
                    .tree
                    .create_leaf(tags::command::NUMBER, Value::Integer(command.to_i64()));
                self.tree.append(id, number)?;
                Ok(id)
            }
        }
    }

    /// Create a command with an explicit field mask
    pub fn command_with_mask(&mut self, command: CommandType, mask: FieldFlags) -> EmberResult<NodeId> {
        let id = self.item(GlowType::Command);
        let number = self
            .tree
            .create_leaf(tags::command::NUMBER, Value::Integer(command.to_i64()));
        let mask = self
            .tree
            .create_leaf(tags::command::DIR_FIELD_MASK, Value::Integer(mask.to_i64()));
        self.tree.append(id, number)?;
        self.tree.append(id, mask)?;
        Ok(id)
    }

    /// `contents` set of an element, created on first use
    ///
    /// A new set is placed before the `children` collection, keeping the
    /// property order of the wire format.
    pub fn contents(&mut self, element: NodeId) -> EmberResult<NodeId> {
        if let Some(contents) = self.tree.child_by_tag(element, tags::element::CONTENTS) {
            return Ok(contents);
        }
        let contents = self.tree.create_set(tags::element::CONTENTS);
        let index = match self.tree.child_by_tag(element, tags::element::CHILDREN) {
            Some(children) => self
                .tree
                .children(element)?
                .iter()
                .position(|id| *id == children)
                .unwrap_or(0),
            None => self.tree.children(element)?.len(),
        };
        self.tree.insert(element, index, contents)?;
        Ok(contents)
    }

    /// Set a property in an element's `contents`
    ///
    /// # Returns
    /// Returns the leaf holding the property.
    pub fn set_contents_property(
        &mut self,
        element: NodeId,
        tag: Tag,
        value: impl Into<Value>,
    ) -> EmberResult<NodeId> {
        let contents = self.contents(element)?;
        let value = value.into();
        match self.tree.child_by_tag(contents, tag) {
            Some(leaf) => {
                self.tree.set_value(leaf, value)?;
                Ok(leaf)
            }
            None => {
                let leaf = self.tree.create_leaf(tag, value);
                self.tree.append(contents, leaf)?;
                Ok(leaf)
            }
        }
    }

    /// `children` collection of an element, created on first use
    pub fn children(&mut self, element: NodeId) -> EmberResult<NodeId> {
        if let Some(children) = self.tree.child_by_tag(element, tags::element::CHILDREN) {
            return Ok(children);
        }
        let children = self.tree.create_container(
            tags::element::CHILDREN,
            GlowType::ElementCollection.tag(),
            ContainerKind::Sequence,
        );
        self.tree.append(element, children)?;
        Ok(children)
    }

    /// Add `element` below `parent`
    ///
    /// A root document takes elements directly; any other element receives
    /// them in its `children` collection.
    pub fn add_element(&mut self, parent: NodeId, element: NodeId) -> EmberResult<()> {
        let collection = if self.tree.type_tag(parent)? == GlowType::RootElementCollection.tag() {
            parent
        } else {
            self.children(parent)?
        };
        self.tree.append(collection, element)
    }

    fn item(&mut self, glow_type: GlowType) -> NodeId {
        self.tree
            .create_container(tags::COLLECTION_ITEM, glow_type.tag(), ContainerKind::Sequence)
    }
}
