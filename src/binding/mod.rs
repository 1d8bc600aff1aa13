//! Provider bindings - route nested nodes to a specific target
//!
//! A binding is configuration derived from another resource's output (a
//! cluster's decoded credentials). Nodes declared with a binding are
//! realized only through that binding's target, never the default one, and
//! only after the binding's connection descriptor has resolved.

use std::fmt;
use std::sync::Arc;

use crate::credentials::ConnectionDescriptor;
use crate::output::{Deferred, NodeId};

/// An immutable, resolved binding to a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderBinding {
    name: NodeId,
    descriptor: ConnectionDescriptor,
}

impl ProviderBinding {
    pub fn new(name: NodeId, descriptor: ConnectionDescriptor) -> Self {
        Self { name, descriptor }
    }

    pub fn name(&self) -> &NodeId {
        &self.name
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Short human label (`name@host`)
    pub fn label(&self) -> String {
        format!(
            "{}@{}",
            self.name,
            self.descriptor.endpoint.host_str().unwrap_or("?")
        )
    }
}

/// Declared binding: resolves once its descriptor resolves
#[derive(Clone)]
pub struct BindingHandle {
    id: NodeId,
    binding: Deferred<Arc<ProviderBinding>>,
}

impl BindingHandle {
    pub(crate) fn new(id: NodeId, binding: Deferred<Arc<ProviderBinding>>) -> Self {
        Self { id, binding }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn binding(&self) -> &Deferred<Arc<ProviderBinding>> {
        &self.binding
    }
}

impl fmt::Debug for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHandle")
            .field("id", &self.id)
            .field("binding", &self.binding)
            .finish()
    }
}

/// Where a resource node is realized
#[derive(Debug, Clone, Default)]
pub enum Target {
    /// The root (cloud) provider
    #[default]
    Default,
    Bound(BindingHandle),
}

impl Target {
    pub fn binding_id(&self) -> Option<&NodeId> {
        match self {
            Self::Default => None,
            Self::Bound(handle) => Some(handle.id()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Bound(handle) => write!(f, "binding:{}", handle.id()),
        }
    }
}
