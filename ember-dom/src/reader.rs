//! Tree-materializing reader
//!
//! [`TreeBuilder`] turns streaming reader events into tree nodes through a
//! [`NodeFactory`]. A container is linked into its parent only once it has
//! been closed, so a decode error never leaves a half-built node attached
//! to a completed tree.
//!
//! # Usage Example
//!
//! ```rust
//! use ember_dom::{DomReader, FactoryRegistry};
//!
//! let mut reader = DomReader::new(FactoryRegistry::new());
//! reader.feed(&[0xA0, 0x03, 0x02, 0x01, 0x2A]).unwrap();
//! let decoded = reader.detach_root().unwrap();
//! assert_eq!(decoded.tree.value_or(decoded.root, 0i64), 42);
//! ```

use crate::error::{EmberError, EmberResult};
use crate::factory::{FactoryRegistry, NodeFactory};
use crate::node::NodeId;
use crate::tree::Tree;
use ember_ber::{AsyncBerReader, ReaderConfig, ReaderHandler, Tag};
use ember_core::Value;
use std::collections::VecDeque;

/// A completely decoded top-level element with the tree that owns it
#[derive(Debug)]
pub struct DecodedTree {
    pub tree: Tree,
    pub root: NodeId,
}

/// Reader handler that builds nodes into a tree
#[derive(Debug)]
pub struct TreeBuilder<F: NodeFactory = FactoryRegistry> {
    factory: F,
    tree: Tree,
    open: Vec<NodeId>,
    completed: VecDeque<NodeId>,
}

impl<F: NodeFactory> TreeBuilder<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            tree: Tree::new(),
            open: Vec::new(),
            completed: VecDeque::new(),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Tree holding completed and in-progress nodes
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Number of completed top-level elements waiting to be detached
    pub fn ready(&self) -> usize {
        self.completed.len()
    }

    /// Number of containers still being decoded
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Free every partially decoded node; completed elements are kept
    pub fn reset(&mut self) {
        for id in self.open.drain(..) {
            if let Err(e) = self.tree.delete(id) {
                log::warn!("Failed to free partial node {}: {}", id, e);
            }
        }
    }

    /// Take the oldest completed top-level element
    pub fn detach_root(&mut self) -> Option<DecodedTree> {
        let root = self.completed.pop_front()?;
        if self.open.is_empty() && self.completed.is_empty() {
            let tree = std::mem::take(&mut self.tree);
            return Some(DecodedTree { tree, root });
        }

        let mut tree = Tree::new();
        let copy = match tree.import_subtree(&self.tree, root) {
            Ok(copy) => copy,
            Err(e) => {
                log::warn!("Failed to detach decoded element {}: {}", root, e);
                return None;
            }
        };
        if let Err(e) = self.tree.delete(root) {
            log::warn!("Failed to free detached element {}: {}", root, e);
        }
        Some(DecodedTree { tree, root: copy })
    }

    fn complete(&mut self, id: NodeId) -> EmberResult<()> {
        match self.open.last() {
            Some(parent) => self.tree.append(*parent, id),
            None => {
                log::debug!("Decoded top-level element {}", id);
                self.completed.push_back(id);
                Ok(())
            }
        }
    }
}

impl<F: NodeFactory> ReaderHandler for TreeBuilder<F> {
    fn on_new_container(&mut self, tag: Tag, type_tag: Tag) -> EmberResult<()> {
        let id = self.factory.create_container(&mut self.tree, tag, type_tag);
        self.open.push(id);
        Ok(())
    }

    fn on_item_ready(&mut self, tag: Tag, value: Value) -> EmberResult<()> {
        let id = self.tree.create_leaf(tag, value);
        self.complete(id)
    }

    fn on_container_ready(&mut self, tag: Tag, _type_tag: Tag) -> EmberResult<()> {
        let id = self.open.pop().ok_or_else(|| {
            EmberError::Asn1Decoding(format!("Container {} closed but none is open", tag))
        })?;
        self.complete(id)
    }
}

/// Streaming reader producing trees
///
/// Bytes may be fed in chunks of any size. After an error, the partial
/// element is discarded and the next byte is read as the start of a new
/// top-level element.
#[derive(Debug)]
pub struct DomReader<F: NodeFactory = FactoryRegistry> {
    reader: AsyncBerReader,
    builder: TreeBuilder<F>,
}

impl DomReader<FactoryRegistry> {
    /// Create a reader with the default depth bound
    pub fn new(registry: FactoryRegistry) -> Self {
        Self::with_factory(registry, ReaderConfig::default())
    }

    /// Create a reader with custom settings
    pub fn with_config(registry: FactoryRegistry, config: ReaderConfig) -> Self {
        Self::with_factory(registry, config)
    }
}

impl<F: NodeFactory> DomReader<F> {
    /// Create a reader over any node factory
    pub fn with_factory(factory: F, config: ReaderConfig) -> Self {
        Self {
            reader: AsyncBerReader::with_config(config),
            builder: TreeBuilder::new(factory),
        }
    }

    /// Feed a chunk of bytes
    ///
    /// # Returns
    /// Returns the number of completed top-level elements ready to detach.
    ///
    /// # Error Handling
    /// On malformed input both the byte reader and the partial tree are
    /// reset before the error is returned.
    pub fn feed(&mut self, data: &[u8]) -> EmberResult<usize> {
        if let Err(e) = self.reader.feed(data, &mut self.builder) {
            self.builder.reset();
            return Err(e);
        }
        Ok(self.builder.ready())
    }

    /// Take the oldest completed top-level element
    pub fn detach_root(&mut self) -> Option<DecodedTree> {
        self.builder.detach_root()
    }

    /// Discard partial state; completed elements are kept
    pub fn reset(&mut self) {
        self.reader.reset();
        self.builder.reset();
    }

    /// Number of completed top-level elements waiting to be detached
    pub fn ready(&self) -> usize {
        self.builder.ready()
    }

    /// Check whether the reader sits between two top-level elements
    pub fn is_idle(&self) -> bool {
        self.reader.is_idle()
    }

    pub fn builder(&self) -> &TreeBuilder<F> {
        &self.builder
    }
}

/// Decode a complete buffer holding exactly one top-level element
pub fn decode_tree(data: &[u8], registry: FactoryRegistry) -> EmberResult<DecodedTree> {
    let mut reader = DomReader::new(registry);
    let ready = reader.feed(data)?;
    if !reader.is_idle() {
        return Err(EmberError::Asn1Decoding(
            "Buffer ends inside an element".to_string(),
        ));
    }
    if ready != 1 {
        return Err(EmberError::InvalidData(format!(
            "Expected one top-level element, found {}",
            ready
        )));
    }
    reader
        .detach_root()
        .ok_or_else(|| EmberError::InvalidData("No element decoded".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ContainerKind;

    fn sample() -> Vec<u8> {
        let mut tree = Tree::new();
        let root = tree.create_container(
            Tag::application(true, 0),
            Tag::application(true, 11),
            ContainerKind::Sequence,
        );
        let element = tree.create_container(
            Tag::context(true, 0),
            Tag::application(true, 1),
            ContainerKind::Sequence,
        );
        let number = tree.create_leaf(Tag::context(true, 0), Value::Integer(1));
        let contents = tree.create_set(Tag::context(true, 1));
        let identifier = tree.create_leaf(Tag::context(true, 0), Value::from("gain"));
        let value = tree.create_leaf(Tag::context(true, 2), Value::Integer(42));
        tree.append(contents, identifier).unwrap();
        tree.append(contents, value).unwrap();
        tree.append(element, number).unwrap();
        tree.append(element, contents).unwrap();
        tree.append(root, element).unwrap();
        tree.encode_to_vec(root).unwrap()
    }

    #[test]
    fn test_decode_tree() {
        let data = sample();
        let mut decoded = decode_tree(&data, FactoryRegistry::new()).unwrap();
        let tree = &decoded.tree;
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.tag(decoded.root).unwrap(), Tag::application(true, 0));

        let element = tree.children(decoded.root).unwrap()[0];
        assert_eq!(tree.type_tag(element).unwrap(), Tag::application(true, 1));
        let contents = tree.child_by_tag(element, Tag::context(true, 1)).unwrap();
        assert_eq!(tree.container_kind(contents), Some(ContainerKind::Set));
        let value = tree.child_by_tag(contents, Tag::context(true, 2)).unwrap();
        assert_eq!(tree.value_or(value, 0i64), 42);

        // Re-encoding reproduces the input
        assert_eq!(decoded.tree.encode_to_vec(decoded.root).unwrap(), data);
    }

    #[test]
    fn test_unknown_application_type_falls_back() {
        let data = sample();
        let decoded = decode_tree(&data, FactoryRegistry::new()).unwrap();
        assert_eq!(decoded.tree.container_kind(decoded.root), Some(ContainerKind::Sequence));
    }

    #[test]
    fn test_byte_at_a_time() {
        let data = sample();
        let mut reader = DomReader::new(FactoryRegistry::new());
        for byte in &data {
            reader.feed(std::slice::from_ref(byte)).unwrap();
        }
        let mut decoded = reader.detach_root().unwrap();
        assert_eq!(decoded.tree.encode_to_vec(decoded.root).unwrap(), data);
        assert!(reader.detach_root().is_none());
    }

    #[test]
    fn test_multiple_roots_queued() {
        let data = sample();
        let mut stream = data.clone();
        stream.extend_from_slice(&data);

        let mut reader = DomReader::new(FactoryRegistry::new());
        assert_eq!(reader.feed(&stream).unwrap(), 2);
        let mut first = reader.detach_root().unwrap();
        assert_eq!(first.tree.len(), 6);
        assert_eq!(first.tree.encode_to_vec(first.root).unwrap(), data);
        let mut second = reader.detach_root().unwrap();
        assert_eq!(second.tree.encode_to_vec(second.root).unwrap(), data);
    }

    #[test]
    fn test_error_discards_partial_tree() {
        let data = sample();
        let mut reader = DomReader::with_config(FactoryRegistry::new(), ReaderConfig::with_max_depth(2));
        assert!(matches!(reader.feed(&data), Err(EmberError::DepthExceeded { max_depth: 2 })));
        assert_eq!(reader.builder().tree().len(), 0);
        assert_eq!(reader.builder().depth(), 0);
        assert!(reader.detach_root().is_none());
    }

    #[test]
    fn test_reset_mid_document() {
        let data = sample();
        let mut reader = DomReader::new(FactoryRegistry::new());
        reader.feed(&data[..data.len() / 2]).unwrap();
        assert!(reader.builder().tree().len() > 0);
        reader.reset();
        assert_eq!(reader.builder().tree().len(), 0);

        reader.feed(&data).unwrap();
        assert!(reader.detach_root().is_some());
    }

    #[test]
    fn test_decode_tree_truncated() {
        let data = sample();
        assert!(decode_tree(&data[..data.len() - 1], FactoryRegistry::new()).is_err());
    }
}
