//! Factory registry preloaded with the Glow types

use crate::types::GlowType;
use ember_dom::{ContainerKind, FactoryRegistry};

/// Registry knowing every Glow application type
///
/// Glow element types are sequences of context-tagged properties; their
/// `contents` are universal sets, which the base registry already knows.
pub fn glow_registry() -> FactoryRegistry {
    let mut registry = FactoryRegistry::new();
    for glow_type in GlowType::ALL {
        registry.register(glow_type.tag(), ContainerKind::Sequence);
    }
    registry
}
