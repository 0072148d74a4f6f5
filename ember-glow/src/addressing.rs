//! Conversion between tree positions and element paths
//!
//! A path is the sequence of element numbers from the document root down to
//! an element. Qualified elements carry their full path, so a path lookup
//! may jump straight to a qualified element instead of walking every level.

use crate::element::GlowElement;
use crate::error::{EmberError, EmberResult};
use crate::tags;
use crate::types::GlowType;
use ember_core::{ObjectIdentifier, Value};
use ember_dom::{ContainerKind, NodeId, Tree};

/// Path of the element owning `node`
///
/// Walks the ancestors collecting element numbers. A qualified ancestor
/// supplies the remaining prefix. Nodes outside any element (the document
/// root) have an empty path.
pub fn make_path(tree: &Tree, node: NodeId) -> EmberResult<ObjectIdentifier> {
    if !tree.contains(node) {
        return Err(EmberError::Ownership(format!("Node {} does not exist", node)));
    }

    let mut numbers = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        if let Some(element) = GlowElement::new(tree, id) {
            let glow_type = element.glow_type();
            if glow_type.is_qualified() {
                let mut path = element.path().ok_or_else(|| {
                    EmberError::InvalidData(format!("{} at {} has no path", glow_type, id))
                })?;
                for number in numbers.into_iter().rev() {
                    path.push(number);
                }
                return Ok(path);
            }
            if glow_type.is_element() {
                let number = element.number().ok_or_else(|| {
                    EmberError::InvalidData(format!("{} at {} has no number", glow_type, id))
                })?;
                numbers.push(number);
            }
        }
        current = tree.parent(id);
    }

    numbers.reverse();
    Ok(ObjectIdentifier::from_arcs(numbers))
}

/// Find the element addressed by `path`, starting at `root`
///
/// Each level consumes one path element by number; a qualified element
/// whose path is a prefix of the requested one consumes its whole path at
/// once. Returns `None` as soon as a level has no match. An empty path
/// resolves to `root`.
pub fn resolve(tree: &Tree, root: NodeId, path: &ObjectIdentifier) -> Option<NodeId> {
    let arcs = path.arcs();
    let mut current = GlowElement::new(tree, root)?;
    let mut consumed = 0;

    while consumed < arcs.len() {
        let mut next: Option<(GlowElement<'_>, usize)> = None;
        for element in current.elements() {
            let advance = if element.glow_type().is_qualified() {
                match element.path() {
                    Some(qualified) if qualified.len() > consumed && qualified.is_prefix_of(path) => {
                        qualified.len()
                    }
                    _ => continue,
                }
            } else if element.number() == Some(arcs[consumed]) {
                consumed + 1
            } else {
                continue;
            };
            if next.is_none_or(|(_, best)| advance > best) {
                next = Some((element, advance));
            }
        }

        let (element, advance) = next?;
        current = element;
        consumed = advance;
    }

    Some(current.id())
}

/// Find a parameter by path
///
/// The last path element is the parameter's own number inside the element
/// addressed by the rest of the path.
pub fn resolve_parameter(tree: &Tree, root: NodeId, path: &ObjectIdentifier) -> Option<NodeId> {
    let number = path.last()?;
    let prefix = path.parent()?;
    let owner = resolve(tree, root, &prefix)?;

    let owner = GlowElement::new(tree, owner)?;
    owner
        .elements()
        .into_iter()
        .find(|element| match element.glow_type() {
            GlowType::Parameter => element.number() == Some(number),
            GlowType::QualifiedParameter => element.path().as_ref() == Some(path),
            _ => false,
        })
        .or_else(|| {
            // A qualified parameter may sit anywhere above its owner
            let found = GlowElement::new(tree, resolve(tree, root, path)?)?;
            (found.glow_type().unqualified() == GlowType::Parameter).then_some(found)
        })
        .map(|element| element.id())
}

/// Create a detached qualified copy of an element
///
/// The copy carries the element's full path and deep copies of all its
/// other properties; its children stay numbered relative to it.
pub fn qualify(tree: &mut Tree, node: NodeId) -> EmberResult<NodeId> {
    let glow_type = GlowElement::new(tree, node)
        .map(|element| element.glow_type())
        .ok_or_else(|| EmberError::InvalidData(format!("Node {} is not a Glow element", node)))?;
    if glow_type.is_qualified() {
        return tree.clone_subtree(node);
    }
    let qualified = glow_type
        .qualified()
        .ok_or_else(|| EmberError::InvalidData(format!("{} cannot be qualified", glow_type)))?;

    let path = make_path(tree, node)?;
    let properties: Vec<NodeId> = tree
        .children(node)?
        .iter()
        .copied()
        .filter(|id| tree.tag(*id).is_ok_and(|tag| tag != tags::element::NUMBER))
        .collect();

    let copy = tree.create_container(tags::COLLECTION_ITEM, qualified.tag(), ContainerKind::Sequence);
    let path_leaf = tree.create_leaf(tags::element::PATH, Value::RelativeObjectIdentifier(path));
    tree.append(copy, path_leaf)?;
    for property in properties {
        let property = tree.clone_subtree(property)?;
        tree.append(copy, property)?;
    }
    log::debug!("Qualified {} {} as {}", glow_type, node, copy);
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GlowBuilder;

    struct Sample {
        root: NodeId,
        device: NodeId,
        channel: NodeId,
        gain: NodeId,
        mute: NodeId,
        remote: NodeId,
        remote_level: NodeId,
    }

    /// root
    /// ├── 1 device
    /// │   └── 2 channel
    /// │       ├── 3 gain
    /// │       └── 4 mute
    /// └── 7.1 remote (qualified)
    ///     └── 5 level
    fn sample(tree: &mut Tree) -> Sample {
        let mut builder = GlowBuilder::new(tree);
        let root = builder.root();
        let device = builder.node(1).unwrap();
        let channel = builder.node(2).unwrap();
        let gain = builder.parameter(3).unwrap();
        let mute = builder.parameter(4).unwrap();
        let remote = builder
            .qualified_node(&ObjectIdentifier::from_arcs(vec![7, 1]))
            .unwrap();
        let remote_level = builder.parameter(5).unwrap();

        builder.add_element(channel, gain).unwrap();
        builder.add_element(channel, mute).unwrap();
        builder.add_element(device, channel).unwrap();
        builder.add_element(root, device).unwrap();
        builder.add_element(remote, remote_level).unwrap();
        builder.add_element(root, remote).unwrap();

        Sample {
            root,
            device,
            channel,
            gain,
            mute,
            remote,
            remote_level,
        }
    }

    fn oid(arcs: &[u32]) -> ObjectIdentifier {
        ObjectIdentifier::from(arcs)
    }

    #[test]
    fn test_make_path() {
        let mut tree = Tree::new();
        let s = sample(&mut tree);
        assert_eq!(make_path(&tree, s.root).unwrap(), oid(&[]));
        assert_eq!(make_path(&tree, s.device).unwrap(), oid(&[1]));
        assert_eq!(make_path(&tree, s.gain).unwrap(), oid(&[1, 2, 3]));
        assert_eq!(make_path(&tree, s.remote).unwrap(), oid(&[7, 1]));
        assert_eq!(make_path(&tree, s.remote_level).unwrap(), oid(&[7, 1, 5]));
    }

    #[test]
    fn test_resolve_round_trip() {
        let mut tree = Tree::new();
        let s = sample(&mut tree);
        for id in [s.root, s.device, s.channel, s.gain, s.mute, s.remote, s.remote_level] {
            let path = make_path(&tree, id).unwrap();
            assert_eq!(resolve(&tree, s.root, &path), Some(id), "path {}", path);
        }
    }

    #[test]
    fn test_resolve_out_of_range() {
        let mut tree = Tree::new();
        let s = sample(&mut tree);
        assert_eq!(resolve(&tree, s.root, &oid(&[9])), None);
        assert_eq!(resolve(&tree, s.root, &oid(&[1, 9])), None);
        assert_eq!(resolve(&tree, s.root, &oid(&[1, 2, 9])), None);
        assert_eq!(resolve(&tree, s.root, &oid(&[1, 2, 3, 0])), None);
        assert_eq!(resolve(&tree, s.root, &oid(&[7])), None);
        assert_eq!(resolve(&tree, s.root, &oid(&[7, 1, 6])), None);
    }

    #[test]
    fn test_resolve_parameter() {
        let mut tree = Tree::new();
        let s = sample(&mut tree);
        assert_eq!(resolve_parameter(&tree, s.root, &oid(&[1, 2, 4])), Some(s.mute));
        assert_eq!(resolve_parameter(&tree, s.root, &oid(&[7, 1, 5])), Some(s.remote_level));
        // Nodes are not parameters
        assert_eq!(resolve_parameter(&tree, s.root, &oid(&[1, 2])), None);
        assert_eq!(resolve_parameter(&tree, s.root, &oid(&[])), None);
    }

    #[test]
    fn test_resolve_qualified_parameter_in_root() {
        let mut tree = Tree::new();
        let s = sample(&mut tree);
        let mut builder = GlowBuilder::new(&mut tree);
        let qualified = builder.qualified_parameter(&oid(&[1, 2, 8])).unwrap();
        builder.add_element(s.root, qualified).unwrap();

        assert_eq!(resolve(&tree, s.root, &oid(&[1, 2, 8])), Some(qualified));
        assert_eq!(resolve_parameter(&tree, s.root, &oid(&[1, 2, 8])), Some(qualified));
    }

    #[test]
    fn test_qualify() {
        let mut tree = Tree::new();
        let s = sample(&mut tree);
        let mut builder = GlowBuilder::new(&mut tree);
        builder
            .set_contents_property(s.channel, tags::node::IDENTIFIER, "ch")
            .unwrap();

        let copy = qualify(&mut tree, s.channel).unwrap();
        assert_eq!(tree.parent(copy), None);

        let view = GlowElement::new(&tree, copy).unwrap();
        assert_eq!(view.glow_type(), GlowType::QualifiedNode);
        assert_eq!(view.path(), Some(oid(&[1, 2])));
        assert_eq!(view.identifier(), Some("ch"));
        assert_eq!(view.elements().len(), 2);

        // Children of the copy keep their absolute paths
        let copied_gain = view.elements()[0].id();
        assert_eq!(make_path(&tree, copied_gain).unwrap(), oid(&[1, 2, 3]));

        // Qualified copy placed into a fresh document resolves by path
        let mut builder = GlowBuilder::new(&mut tree);
        let document = builder.root();
        builder.add_element(document, copy).unwrap();
        assert!(resolve(&tree, document, &oid(&[1, 2, 4])).is_some());
    }

    #[test]
    fn test_qualify_rejects_non_elements() {
        let mut tree = Tree::new();
        let s = sample(&mut tree);
        assert!(qualify(&mut tree, s.root).is_err());
    }
}
