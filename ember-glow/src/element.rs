//! Read-only view of a Glow element stored in a [`Tree`]

use crate::tags;
use crate::types::{CommandType, GlowType};
use ember_ber::Tag;
use ember_core::{ObjectIdentifier, Value};
use ember_dom::{NodeId, Tree};

/// View of a container whose type tag is a Glow application type
#[derive(Debug, Clone, Copy)]
pub struct GlowElement<'a> {
    tree: &'a Tree,
    id: NodeId,
    glow_type: GlowType,
}

impl<'a> GlowElement<'a> {
    /// View `id` as a Glow element
    ///
    /// Returns `None` for leaves, stale handles and containers whose type
    /// tag is not a Glow type.
    pub fn new(tree: &'a Tree, id: NodeId) -> Option<Self> {
        if tree.is_leaf(id) {
            return None;
        }
        let glow_type = GlowType::from_tag(tree.type_tag(id).ok()?)?;
        Some(Self { tree, id, glow_type })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn glow_type(&self) -> GlowType {
        self.glow_type
    }

    fn property(&self, tag: Tag) -> Option<&'a Value> {
        let leaf = self.tree.child_by_tag(self.id, tag)?;
        self.tree.value(leaf).ok()
    }

    /// Local number of a numbered element or command
    pub fn number(&self) -> Option<u32> {
        if self.glow_type.is_qualified() || self.glow_type == GlowType::RootElementCollection {
            return None;
        }
        let number = self.property(tags::element::NUMBER)?.as_integer()?;
        u32::try_from(number).ok()
    }

    /// Full path of a qualified element
    pub fn path(&self) -> Option<ObjectIdentifier> {
        if !self.glow_type.is_qualified() {
            return None;
        }
        self.property(tags::element::PATH)?.as_oid().cloned()
    }

    /// The `contents` set
    pub fn contents(&self) -> Option<NodeId> {
        self.tree.child_by_tag(self.id, tags::element::CONTENTS)
    }

    /// A property of the `contents` set
    pub fn contents_property(&self, tag: Tag) -> Option<&'a Value> {
        let leaf = self.tree.child_by_tag(self.contents()?, tag)?;
        self.tree.value(leaf).ok()
    }

    pub fn identifier(&self) -> Option<&'a str> {
        self.contents_property(tags::node::IDENTIFIER)?.as_str()
    }

    pub fn description(&self) -> Option<&'a str> {
        self.contents_property(tags::node::DESCRIPTION)?.as_str()
    }

    /// Current value of a parameter
    pub fn value(&self) -> Option<&'a Value> {
        match self.glow_type.unqualified() {
            GlowType::Parameter => self.contents_property(tags::parameter::VALUE),
            _ => None,
        }
    }

    pub fn command_type(&self) -> Option<CommandType> {
        if self.glow_type != GlowType::Command {
            return None;
        }
        CommandType::from_i64(self.property(tags::command::NUMBER)?.as_integer()?)
    }

    /// Elements directly below this one
    ///
    /// For a root collection these are its items; for any other element the
    /// items of its `children` collection.
    pub fn elements(&self) -> Vec<GlowElement<'a>> {
        let collection = if self.glow_type == GlowType::RootElementCollection {
            Some(self.id)
        } else {
            self.tree.child_by_tag(self.id, tags::element::CHILDREN)
        };
        collection
            .and_then(|id| self.tree.children(id).ok())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| GlowElement::new(self.tree, *child))
            .collect()
    }
}
