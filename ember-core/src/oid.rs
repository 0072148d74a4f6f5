use crate::error::{EmberError, EmberResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Object identifier for addressing Ember+ elements
///
/// An ordered sequence of non-negative arcs. It serves both as the BER
/// OBJECT IDENTIFIER / RELATIVE-OID payload and as the entity path of a
/// node or parameter (the numbers walked from the root to the element).
///
/// Two identifiers are equal when they have the same length and the same
/// arcs pairwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectIdentifier {
    arcs: Vec<u32>,
}

impl ObjectIdentifier {
    /// Create an empty identifier
    pub fn new() -> Self {
        Self { arcs: Vec::new() }
    }

    /// Create an identifier from its arcs
    pub fn from_arcs(arcs: impl Into<Vec<u32>>) -> Self {
        Self { arcs: arcs.into() }
    }

    /// Parse an identifier from dotted notation, e.g. `"1.2.3"`
    ///
    /// The empty string parses to the empty identifier.
    pub fn from_string(s: &str) -> EmberResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::new());
        }

        let mut arcs = Vec::new();
        for part in s.split('.') {
            let arc = part
                .trim()
                .parse::<u32>()
                .map_err(|_| EmberError::InvalidData(format!("Invalid identifier arc: {:?}", part)))?;
            arcs.push(arc);
        }

        Ok(Self { arcs })
    }

    /// Get the arcs as a slice
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Number of arcs
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check whether the identifier has no arcs
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Last arc, i.e. the element's own number
    pub fn last(&self) -> Option<u32> {
        self.arcs.last().copied()
    }

    /// Append an arc
    pub fn push(&mut self, arc: u32) {
        self.arcs.push(arc);
    }

    /// Remove and return the last arc
    pub fn pop(&mut self) -> Option<u32> {
        self.arcs.pop()
    }

    /// Identifier of the parent element (all arcs but the last)
    pub fn parent(&self) -> Option<Self> {
        if self.arcs.is_empty() {
            None
        } else {
            Some(Self::from_arcs(&self.arcs[..self.arcs.len() - 1]))
        }
    }

    /// Identifier extended by one arc
    pub fn child(&self, arc: u32) -> Self {
        let mut arcs = Vec::with_capacity(self.arcs.len() + 1);
        arcs.extend_from_slice(&self.arcs);
        arcs.push(arc);
        Self { arcs }
    }

    /// Check whether `self` is a (non-strict) prefix of `other`
    pub fn is_prefix_of(&self, other: &ObjectIdentifier) -> bool {
        other.arcs.starts_with(&self.arcs)
    }

    /// Arcs of `self` remaining after removing `prefix`
    pub fn strip_prefix(&self, prefix: &ObjectIdentifier) -> Option<&[u32]> {
        self.arcs.strip_prefix(prefix.arcs.as_slice())
    }

    /// Iterate over the arcs
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.arcs.iter().copied()
    }
}

impl From<Vec<u32>> for ObjectIdentifier {
    fn from(arcs: Vec<u32>) -> Self {
        Self { arcs }
    }
}

impl From<&[u32]> for ObjectIdentifier {
    fn from(arcs: &[u32]) -> Self {
        Self::from_arcs(arcs)
    }
}

impl FromStr for ObjectIdentifier {
    type Err = EmberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.arcs.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
        }
        Ok(())
    }
}
