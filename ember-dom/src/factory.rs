//! Node factory registry
//!
//! Maps container type tags to the kind of container the tree reader
//! materializes. Unknown application types fall back to a default kind, so
//! schema extensions decode into generic containers instead of failing.

use crate::node::{ContainerKind, NodeId};
use crate::tree::Tree;
use ember_ber::Tag;
use std::collections::HashMap;

/// Creates tree nodes for decoded elements
pub trait NodeFactory {
    /// Create the container for an element opened with `tag`/`type_tag`
    fn create_container(&self, tree: &mut Tree, tag: Tag, type_tag: Tag) -> NodeId;
}

/// Registry of known container types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryRegistry {
    kinds: HashMap<Tag, ContainerKind>,
    default_kind: ContainerKind,
}

impl FactoryRegistry {
    /// Create a registry knowing the universal `SEQUENCE` and `SET` types
    pub fn new() -> Self {
        let mut kinds = HashMap::new();
        kinds.insert(Tag::SEQUENCE, ContainerKind::Sequence);
        kinds.insert(Tag::SET, ContainerKind::Set);
        Self {
            kinds,
            default_kind: ContainerKind::Sequence,
        }
    }

    /// Use `kind` for type tags that are not registered
    pub fn with_default_kind(mut self, kind: ContainerKind) -> Self {
        self.default_kind = kind;
        self
    }

    /// Register a container type
    ///
    /// # Returns
    /// Returns the previously registered kind, if any.
    pub fn register(&mut self, type_tag: Tag, kind: ContainerKind) -> Option<ContainerKind> {
        self.kinds.insert(type_tag.to_container(), kind)
    }

    pub fn contains(&self, type_tag: Tag) -> bool {
        self.kinds.contains_key(&type_tag.to_container())
    }

    pub fn default_kind(&self) -> ContainerKind {
        self.default_kind
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Container kind for a type tag, falling back to the default kind
    pub fn kind_for(&self, type_tag: Tag) -> ContainerKind {
        match self.kinds.get(&type_tag.to_container()) {
            Some(kind) => *kind,
            None => {
                log::debug!("Unknown container type {}, using {:?}", type_tag, self.default_kind);
                self.default_kind
            }
        }
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeFactory for FactoryRegistry {
    fn create_container(&self, tree: &mut Tree, tag: Tag, type_tag: Tag) -> NodeId {
        tree.create_container(tag, type_tag, self.kind_for(type_tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        let registry = FactoryRegistry::new();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.kind_for(Tag::SET), ContainerKind::Set);
        assert_eq!(registry.kind_for(Tag::SEQUENCE), ContainerKind::Sequence);
    }

    #[test]
    fn test_unknown_type_fallback() {
        let registry = FactoryRegistry::new();
        let unknown = Tag::application(true, 99);
        assert!(!registry.contains(unknown));
        assert_eq!(registry.kind_for(unknown), ContainerKind::Sequence);

        let registry = registry.with_default_kind(ContainerKind::Set);
        assert_eq!(registry.kind_for(unknown), ContainerKind::Set);
    }

    #[test]
    fn test_register() {
        let mut registry = FactoryRegistry::new();
        assert_eq!(registry.register(Tag::application(false, 3), ContainerKind::Set), None);
        assert!(registry.contains(Tag::application(true, 3)));
        assert_eq!(
            registry.register(Tag::application(true, 3), ContainerKind::Sequence),
            Some(ContainerKind::Set)
        );
    }

    #[test]
    fn test_factory_creates_container() {
        let registry = FactoryRegistry::new();
        let mut tree = Tree::new();
        let id = registry.create_container(&mut tree, Tag::context(true, 1), Tag::SET);
        assert_eq!(tree.container_kind(id), Some(ContainerKind::Set));
    }
}
