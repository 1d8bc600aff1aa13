//! Interning for node names
//!
//! Node names are compared and cloned constantly while the engine wires
//! dependencies, so each distinct name is allocated once and shared as `Arc<str>`.

use std::sync::Arc;

use dashmap::DashSet;
use once_cell::sync::Lazy;

static NODE_NAMES: Lazy<Interner> = Lazy::new(Interner::new);

/// Thread-safe string interner backed by a `DashSet`
#[derive(Default)]
pub struct Interner {
    names: DashSet<Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared `Arc<str>` for `name`, allocating it on first sight
    pub fn intern(&self, name: &str) -> Arc<str> {
        if let Some(existing) = self.names.get(name) {
            return Arc::clone(existing.key());
        }
        let fresh: Arc<str> = Arc::from(name);
        // Another thread may have won the race; keep whichever landed first.
        if self.names.insert(Arc::clone(&fresh)) {
            fresh
        } else {
            self.names
                .get(name)
                .map(|existing| Arc::clone(existing.key()))
                .unwrap_or(fresh)
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Intern a node name using the global interner
#[inline]
pub fn intern(name: &str) -> Arc<str> {
    NODE_NAMES.intern(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_shares_allocation() {
        let interner = Interner::new();
        let a = interner.intern("resource_group");
        let b = interner.intern("resource_group");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn distinct_names_are_distinct() {
        let interner = Interner::new();
        let a = interner.intern("resource_group");
        let b = interner.intern("managed_cluster");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn concurrent_interning_converges() {
        use std::thread;

        let interner = Arc::new(Interner::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let interner = Arc::clone(&interner);
                thread::spawn(move || interner.intern("nginx"))
            })
            .collect();

        let ids: Vec<Arc<str>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|id| Arc::ptr_eq(id, &ids[0])));
        assert_eq!(interner.len(), 1);
    }
}
