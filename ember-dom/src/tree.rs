//! Arena-backed tree of BER nodes
//!
//! Nodes live in a slot arena and refer to each other through [`NodeId`]
//! handles. The parent owns its children; a node without a parent is the
//! root of a detached fragment.
//!
//! Every node caches its encoded length. A mutation marks the node and all
//! of its ancestors dirty; [`Tree::update`] recomputes the cache bottom-up
//! over the dirty nodes only.

use crate::error::{EmberError, EmberResult};
use crate::node::{ContainerKind, NodeData, NodeId, NodeKind, PropertyFlags};
use ember_ber::encoder::frame_length;
use ember_ber::{codec, BerEncoder, Length, OctetSink, Tag};
use ember_core::{FromValue, Value};
use std::collections::HashMap;
use std::fmt;

/// Dirty-state listener, called with the node and its accumulated flags
pub type Observer = Box<dyn FnMut(NodeId, PropertyFlags) + Send>;

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<NodeData>,
}

/// Owned copy of a subtree, used to move nodes between arenas
enum Fragment {
    Leaf {
        tag: Tag,
        value: Value,
    },
    Container {
        tag: Tag,
        type_tag: Tag,
        kind: ContainerKind,
        children: Vec<Fragment>,
    },
}

/// Tree model
#[derive(Default)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
    observers: HashMap<NodeId, Vec<Observer>>,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("len", &self.len)
            .field("slots", &self.slots.len())
            .field("observed", &self.observers.len())
            .finish()
    }
}

fn stale(id: NodeId) -> EmberError {
    EmberError::Ownership(format!("Node {} does not exist", id))
}

/// Encoded length of a container holding `contents` octets of children
fn container_length(tag: Tag, type_tag: Tag, contents: usize) -> usize {
    let inner = type_tag.encoded_length() + Length::new(contents).encoded_length() + contents;
    tag.encoded_length() + Length::new(inner).encoded_length() + inner
}

impl Tree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check whether a handle refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn node(&self, id: NodeId) -> EmberResult<&NodeData> {
        self.get(id).ok_or_else(|| stale(id))
    }

    fn allocate(&mut self, data: NodeData) -> NodeId {
        self.len += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(data);
                NodeId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(data),
                });
                NodeId::new(index, 0)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            if slot.generation == id.generation && slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                self.len -= 1;
                self.observers.remove(&id);
            }
        }
    }

    // -----------------------------------------------------------------
    // Construction

    /// Create a detached leaf holding `value`
    ///
    /// The outer tag is always encoded constructed, since it wraps the
    /// value's universal TLV.
    pub fn create_leaf(&mut self, tag: Tag, value: Value) -> NodeId {
        self.allocate(NodeData::new(tag.to_container(), NodeKind::Leaf { value }))
    }

    /// Create a detached, empty container
    pub fn create_container(&mut self, tag: Tag, type_tag: Tag, kind: ContainerKind) -> NodeId {
        self.allocate(NodeData::new(
            tag.to_container(),
            NodeKind::Container {
                type_tag: type_tag.to_container(),
                kind,
                children: Vec::new(),
            },
        ))
    }

    /// Create a detached universal `SEQUENCE`
    pub fn create_sequence(&mut self, tag: Tag) -> NodeId {
        self.create_container(tag, Tag::SEQUENCE, ContainerKind::Sequence)
    }

    /// Create a detached universal `SET`
    pub fn create_set(&mut self, tag: Tag) -> NodeId {
        self.create_container(tag, Tag::SET, ContainerKind::Set)
    }

    // -----------------------------------------------------------------
    // Structure

    /// Insert `child` into `parent` at position `index`
    ///
    /// # Error Handling
    /// Returns `Ownership` without changing the tree if either handle is
    /// stale, `parent` is a leaf, `child` already has a parent, `child` is
    /// `parent` or one of its ancestors, or `index` is out of range.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> EmberResult<()> {
        let child_data = self.node(child)?;
        if let Some(owner) = child_data.parent {
            return Err(EmberError::Ownership(format!(
                "Node {} already belongs to {}",
                child, owner
            )));
        }
        let child_tag = child_data.tag;

        let parent_data = self.node(parent)?;
        let count = match &parent_data.kind {
            NodeKind::Container { children, .. } => children.len(),
            NodeKind::Leaf { .. } => {
                return Err(EmberError::Ownership(format!(
                    "Cannot insert into leaf {}",
                    parent
                )));
            }
        };
        if index > count {
            return Err(EmberError::Ownership(format!(
                "Index {} out of range for {} children",
                index, count
            )));
        }

        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(EmberError::Ownership(format!(
                    "Inserting {} below itself would create a cycle",
                    child
                )));
            }
            ancestor = self.get(id).and_then(|node| node.parent);
        }

        if let Some(NodeData {
            kind: NodeKind::Container { children, .. },
            ..
        }) = self.get_mut(parent)
        {
            children.insert(index, child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        self.propagate(parent, PropertyFlags::for_tag(child_tag));
        Ok(())
    }

    /// Append `child` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> EmberResult<()> {
        let count = self.node(parent)?.children().len();
        self.insert(parent, count, child)
    }

    /// Detach `child` from `parent`
    ///
    /// The child survives as the root of a detached fragment.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> EmberResult<()> {
        let child_data = self.node(child)?;
        if child_data.parent != Some(parent) {
            return Err(EmberError::Ownership(format!(
                "Node {} is not a child of {}",
                child, parent
            )));
        }
        let child_tag = child_data.tag;

        if let Some(NodeData {
            kind: NodeKind::Container { children, .. },
            ..
        }) = self.get_mut(parent)
        {
            children.retain(|id| *id != child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = None;
        }
        self.propagate(parent, PropertyFlags::for_tag(child_tag));
        Ok(())
    }

    /// Detach `id` from its parent and free it with all its descendants
    pub fn delete(&mut self, id: NodeId) -> EmberResult<()> {
        if let Some(parent) = self.node(id)?.parent {
            self.remove(parent, id)?;
        }
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.get(next) {
                pending.extend_from_slice(node.children());
            }
            self.release(next);
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Access

    /// Replace the value of a leaf
    pub fn set_value(&mut self, leaf: NodeId, value: Value) -> EmberResult<()> {
        let node = self.get_mut(leaf).ok_or_else(|| stale(leaf))?;
        let tag = node.tag;
        match &mut node.kind {
            NodeKind::Leaf { value: current } => *current = value,
            NodeKind::Container { .. } => {
                return Err(EmberError::InvalidData(format!(
                    "Node {} is a container, not a leaf",
                    leaf
                )));
            }
        }
        self.propagate(leaf, PropertyFlags::for_tag(tag));
        Ok(())
    }

    /// Value of a leaf
    pub fn value(&self, leaf: NodeId) -> EmberResult<&Value> {
        match &self.node(leaf)?.kind {
            NodeKind::Leaf { value } => Ok(value),
            NodeKind::Container { .. } => Err(EmberError::InvalidData(format!(
                "Node {} is a container, not a leaf",
                leaf
            ))),
        }
    }

    /// Typed value of a leaf, or `default` when the node is missing, is a
    /// container, or holds a value of another type
    pub fn value_or<T: FromValue>(&self, leaf: NodeId, default: T) -> T {
        self.value(leaf)
            .ok()
            .and_then(T::from_value)
            .unwrap_or(default)
    }

    /// Children of a node in insertion order (empty for leaves)
    pub fn children(&self, id: NodeId) -> EmberResult<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    /// First child of `id` whose outer tag is `tag`
    pub fn child_by_tag(&self, id: NodeId, tag: Tag) -> Option<NodeId> {
        let wanted = tag.to_container();
        self.get(id)?
            .children()
            .iter()
            .copied()
            .find(|child| self.get(*child).is_some_and(|node| node.tag == wanted))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// Outer tag of a node
    pub fn tag(&self, id: NodeId) -> EmberResult<Tag> {
        Ok(self.node(id)?.tag)
    }

    /// Type tag of a node: the declared type of a container, or the
    /// universal tag of a leaf's value
    pub fn type_tag(&self, id: NodeId) -> EmberResult<Tag> {
        Ok(match &self.node(id)?.kind {
            NodeKind::Leaf { value } => codec::universal_tag(value),
            NodeKind::Container { type_tag, .. } => *type_tag,
        })
    }

    pub fn kind(&self, id: NodeId) -> EmberResult<&NodeKind> {
        Ok(&self.node(id)?.kind)
    }

    /// Container kind, `None` for leaves and stale handles
    pub fn container_kind(&self, id: NodeId) -> Option<ContainerKind> {
        match self.get(id)?.kind {
            NodeKind::Container { kind, .. } => Some(kind),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.get(id), Some(NodeData { kind: NodeKind::Leaf { .. }, .. }))
    }

    /// Dirty state of a node (`false` for stale handles)
    pub fn is_dirty(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.dirty)
    }

    /// Properties changed below a node since its last update
    pub fn property_flags(&self, id: NodeId) -> PropertyFlags {
        self.get(id).map(|node| node.flags).unwrap_or_default()
    }

    /// Walk up to the root of the fragment containing `id`
    pub fn root_of(&self, id: NodeId) -> EmberResult<NodeId> {
        let mut current = id;
        while let Some(parent) = self.node(current)?.parent {
            current = parent;
        }
        Ok(current)
    }

    // -----------------------------------------------------------------
    // Dirty state

    /// Mark a node and all of its ancestors dirty
    pub fn mark_dirty(&mut self, id: NodeId) -> EmberResult<()> {
        self.node(id)?;
        self.propagate(id, PropertyFlags::NONE);
        Ok(())
    }

    /// Register a dirty-state listener on `id`
    ///
    /// The callback runs after every mutation at or below the node, with the
    /// flags accumulated since the node's last update.
    pub fn observe<F>(&mut self, id: NodeId, callback: F) -> EmberResult<()>
    where
        F: FnMut(NodeId, PropertyFlags) + Send + 'static,
    {
        self.node(id)?;
        self.observers.entry(id).or_default().push(Box::new(callback));
        Ok(())
    }

    /// Remove every listener registered on `id`
    pub fn unobserve(&mut self, id: NodeId) {
        self.observers.remove(&id);
    }

    fn propagate(&mut self, start: NodeId, changed: PropertyFlags) {
        let mut current = Some(start);
        let mut flags = changed;
        let mut notify = Vec::new();

        while let Some(id) = current {
            let Some(node) = self.get_mut(id) else {
                break;
            };
            node.dirty = true;
            node.flags.insert(flags);
            let (tag, accumulated, parent) = (node.tag, node.flags, node.parent);
            if self.observers.contains_key(&id) {
                notify.push((id, accumulated));
            }
            flags = PropertyFlags::for_tag(tag);
            current = parent;
        }

        for (id, flags) in notify {
            if let Some(callbacks) = self.observers.get_mut(&id) {
                for callback in callbacks.iter_mut() {
                    callback(id, flags);
                }
            }
        }
    }

    /// Recompute cached lengths of the dirty nodes below `id`
    ///
    /// # Returns
    /// Returns the encoded length of `id`. Calling `update` again without a
    /// mutation in between visits only `id` itself.
    pub fn update(&mut self, id: NodeId) -> EmberResult<usize> {
        self.node(id)?;
        Ok(self.refresh(id))
    }

    fn refresh(&mut self, id: NodeId) -> usize {
        let Some(node) = self.get(id) else {
            return 0;
        };
        if !node.dirty {
            return node.encoded_length;
        }

        let tag = node.tag;
        let length = match &node.kind {
            NodeKind::Leaf { value } => frame_length(tag, value),
            NodeKind::Container { type_tag, children, .. } => {
                let type_tag = *type_tag;
                let children = children.clone();
                let contents: usize = children.iter().map(|child| self.refresh(*child)).sum();
                container_length(tag, type_tag, contents)
            }
        };

        if let Some(node) = self.get_mut(id) {
            node.dirty = false;
            node.flags.clear();
            node.encoded_length = length;
        }
        length
    }

    /// Encoded length of a node, updating it first if needed
    pub fn encoded_length(&mut self, id: NodeId) -> EmberResult<usize> {
        self.update(id)
    }

    // -----------------------------------------------------------------
    // Encoding

    /// Encode a subtree with definite lengths
    ///
    /// # Returns
    /// Returns the number of octets written.
    ///
    /// # Error Handling
    /// A fixed-size sink reports `BufferOverrun` when it is too small; the
    /// octets already written are left in the sink.
    pub fn encode<S: OctetSink>(&mut self, id: NodeId, sink: S) -> EmberResult<usize> {
        let length = self.update(id)?;
        let mut encoder = BerEncoder::with_sink(sink);
        self.write_definite(id, &mut encoder)?;
        Ok(length)
    }

    /// Encode a subtree into a new buffer
    pub fn encode_to_vec(&mut self, id: NodeId) -> EmberResult<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.update(id)?);
        self.encode(id, &mut buffer)?;
        Ok(buffer)
    }

    fn write_definite<S: OctetSink>(&self, id: NodeId, encoder: &mut BerEncoder<S>) -> EmberResult<()> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Leaf { value } => encoder.encode_frame(node.tag, value),
            NodeKind::Container { type_tag, children, .. } => {
                let contents = children
                    .iter()
                    .map(|child| self.node(*child).map(|data| data.encoded_length))
                    .sum::<EmberResult<usize>>()?;
                let inner = type_tag.encoded_length() + Length::new(contents).encoded_length() + contents;

                encoder.encode_tag(node.tag)?;
                encoder.encode_length(inner)?;
                encoder.encode_tag(*type_tag)?;
                encoder.encode_length(contents)?;
                for child in children {
                    self.write_definite(*child, encoder)?;
                }
                Ok(())
            }
        }
    }

    /// Encode a subtree with indefinite lengths on every outer tag and
    /// container
    ///
    /// No lengths are computed and dirty state is left untouched.
    pub fn encode_indefinite<S: OctetSink>(&self, id: NodeId, sink: S) -> EmberResult<()> {
        let mut encoder = BerEncoder::with_sink(sink);
        self.write_indefinite(id, &mut encoder)
    }

    fn write_indefinite<S: OctetSink>(&self, id: NodeId, encoder: &mut BerEncoder<S>) -> EmberResult<()> {
        let node = self.node(id)?;
        encoder.encode_tag(node.tag)?;
        encoder.encode_indefinite_length()?;
        match &node.kind {
            NodeKind::Leaf { value } => encoder.encode_value(value)?,
            NodeKind::Container { type_tag, children, .. } => {
                encoder.encode_tag(*type_tag)?;
                encoder.encode_indefinite_length()?;
                for child in children {
                    self.write_indefinite(*child, encoder)?;
                }
                encoder.encode_end_of_contents()?;
            }
        }
        encoder.encode_end_of_contents()
    }

    // -----------------------------------------------------------------
    // Copying

    fn extract(&self, id: NodeId) -> EmberResult<Fragment> {
        let node = self.node(id)?;
        Ok(match &node.kind {
            NodeKind::Leaf { value } => Fragment::Leaf {
                tag: node.tag,
                value: value.clone(),
            },
            NodeKind::Container {
                type_tag,
                kind,
                children,
            } => Fragment::Container {
                tag: node.tag,
                type_tag: *type_tag,
                kind: *kind,
                children: children
                    .iter()
                    .map(|child| self.extract(*child))
                    .collect::<EmberResult<_>>()?,
            },
        })
    }

    fn materialize(&mut self, fragment: Fragment) -> NodeId {
        match fragment {
            Fragment::Leaf { tag, value } => self.create_leaf(tag, value),
            Fragment::Container {
                tag,
                type_tag,
                kind,
                children,
            } => {
                let id = self.create_container(tag, type_tag, kind);
                let ids: Vec<NodeId> = children
                    .into_iter()
                    .map(|child| self.materialize(child))
                    .collect();
                for child in &ids {
                    if let Some(node) = self.get_mut(*child) {
                        node.parent = Some(id);
                    }
                }
                if let Some(NodeData {
                    kind: NodeKind::Container { children, .. },
                    ..
                }) = self.get_mut(id)
                {
                    *children = ids;
                }
                id
            }
        }
    }

    /// Deep-copy a subtree into a new detached fragment of this tree
    pub fn clone_subtree(&mut self, id: NodeId) -> EmberResult<NodeId> {
        let fragment = self.extract(id)?;
        Ok(self.materialize(fragment))
    }

    /// Deep-copy a subtree of another tree into a detached fragment of this
    /// tree
    pub fn import_subtree(&mut self, from: &Tree, id: NodeId) -> EmberResult<NodeId> {
        let fragment = from.extract(id)?;
        Ok(self.materialize(fragment))
    }
}
