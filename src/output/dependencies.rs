//! Node identities and the dependency sets carried by deferred values

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::interner::intern;

/// Logical name of a graph entry (resource, lookup, binding or status watch)
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(name: &str) -> Self {
        Self(intern(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_arc(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// The graph entries a deferred value was derived from.
///
/// Only direct upstream entries are recorded; transitive edges live in the
/// graph itself. Ordered so previews and event logs are deterministic.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Dependencies(Arc<BTreeSet<NodeId>>);

impl Dependencies {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(id: NodeId) -> Self {
        Self(Arc::new(BTreeSet::from([id])))
    }

    /// Union of two dependency sets (shares the allocation when one side is empty)
    pub fn union(&self, other: &Dependencies) -> Dependencies {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let merged: BTreeSet<NodeId> = self.0.iter().chain(other.0.iter()).cloned().collect();
        Self(Arc::new(merged))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<NodeId> for Dependencies {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_merges_and_dedups() {
        let a: Dependencies = [NodeId::new("rg"), NodeId::new("identity")].into_iter().collect();
        let b: Dependencies = [NodeId::new("rg"), NodeId::new("client_config")]
            .into_iter()
            .collect();

        let merged = a.union(&b);
        assert_eq!(merged.len(), 3);
        assert!(merged.contains("rg"));
        assert!(merged.contains("identity"));
        assert!(merged.contains("client_config"));
    }

    #[test]
    fn union_with_empty_is_identity() {
        let a = Dependencies::single(NodeId::new("rg"));
        assert_eq!(a.union(&Dependencies::none()), a);
        assert_eq!(Dependencies::none().union(&a), a);
    }

    #[test]
    fn iteration_is_sorted() {
        let deps: Dependencies = [NodeId::new("zeta"), NodeId::new("alpha")].into_iter().collect();
        let names: Vec<&str> = deps.iter().map(NodeId::as_str).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
