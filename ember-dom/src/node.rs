//! Node handles and per-node data

use ember_ber::{Tag, TagClass};
use ember_core::Value;
use std::fmt;

/// Handle to a node stored in a [`Tree`](crate::Tree)
///
/// Handles carry a generation counter: once a node is deleted its slot may
/// be reused, but the old handle no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot of this node
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Encoding shape of a container's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Ordered children, universal type `SEQUENCE` or an application type
    Sequence,
    /// Children in any order, universal type `SET`
    Set,
}

/// Shape of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf {
        value: Value,
    },
    Container {
        type_tag: Tag,
        kind: ContainerKind,
        children: Vec<NodeId>,
    },
}

/// Set of changed properties below a container
///
/// Bit `n` stands for the context-specific tag number `n` of the child on
/// the path to the mutation. Tag numbers above 62 and non-context tags share
/// the [`PropertyFlags::OTHER`] bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PropertyFlags(u64);

impl PropertyFlags {
    pub const NONE: PropertyFlags = PropertyFlags(0);
    pub const OTHER: PropertyFlags = PropertyFlags(1 << 63);

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Flag for the property identified by `tag`
    pub fn for_tag(tag: Tag) -> Self {
        match tag.class() {
            TagClass::ContextSpecific if tag.number() < 63 => Self(1 << tag.number()),
            _ => Self::OTHER,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check whether the context tag `number` is flagged
    pub fn contains(&self, number: u32) -> bool {
        number < 63 && self.0 & (1 << number) != 0
    }

    pub fn insert(&mut self, other: PropertyFlags) {
        self.0 |= other.0;
    }

    pub fn union(self, other: PropertyFlags) -> Self {
        Self(self.0 | other.0)
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Context tag numbers that are flagged, ascending
    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        (0..63).filter(move |n| self.contains(*n))
    }
}

/// Arena entry
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) tag: Tag,
    pub(crate) parent: Option<NodeId>,
    pub(crate) dirty: bool,
    pub(crate) encoded_length: usize,
    pub(crate) flags: PropertyFlags,
    pub(crate) kind: NodeKind,
}

impl NodeData {
    pub(crate) fn new(tag: Tag, kind: NodeKind) -> Self {
        Self {
            tag,
            parent: None,
            dirty: true,
            encoded_length: 0,
            flags: PropertyFlags::NONE,
            kind,
        }
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Container { children, .. } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }
}
