//! Resource Module - declared infrastructure objects
//!
//! - `kind`: the resource kinds the graph knows
//! - `input`: literal-or-deferred inputs
//! - `spec`: typed, validated arguments per kind
//!
//! Declaring a resource yields a [`Resource`] handle whose outputs are a
//! deferred document. Downstream resources take fields of that document as
//! inputs, which is what creates edges in the graph.

pub mod input;
pub mod kind;
pub mod spec;

use std::fmt;

use serde_json::Value;

use crate::binding::{BindingHandle, Target};
use crate::error::{Result, SkyError};
use crate::output::{Deferred, Dependencies, NodeId, Resolver};
use crate::util::path;

pub use input::Input;
pub use kind::ResourceKind;
pub use spec::ResourceSpec;

/// Per-resource declaration options
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    /// Binding whose target realizes the resource (default target otherwise)
    pub provider: Option<BindingHandle>,
    /// Explicit edges in addition to the ones implied by inputs
    pub depends_on: Vec<NodeId>,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, binding: &BindingHandle) -> Self {
        self.provider = Some(binding.clone());
        self
    }

    pub fn depends_on(mut self, resource: &Resource) -> Self {
        self.depends_on.push(resource.id().clone());
        self
    }

    pub(crate) fn target(&self) -> Target {
        match &self.provider {
            Some(handle) => Target::Bound(handle.clone()),
            None => Target::Default,
        }
    }
}

/// Handle to a declared resource and its (deferred) outputs
#[derive(Clone)]
pub struct Resource {
    id: NodeId,
    kind: ResourceKind,
    outputs: Deferred<Value>,
}

impl Resource {
    pub(crate) fn new(id: NodeId, kind: ResourceKind, outputs: Deferred<Value>) -> Self {
        Self { id, kind, outputs }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The whole output document reported by the provider
    pub fn outputs(&self) -> &Deferred<Value> {
        &self.outputs
    }

    /// One field of the outputs (`name`, `metadata.name`, ...)
    ///
    /// The path is checked now; a field missing from the provider's response
    /// fails the value with `OutputMissing`.
    pub fn output(&self, field: &str) -> Result<Deferred<Value>> {
        let segments = path::parse(field)?;
        let node = self.id.clone();
        Ok(self.outputs.try_map(move |outputs| {
            path::apply(&outputs, &segments)
                .cloned()
                .ok_or_else(|| SkyError::OutputMissing {
                    node: node.to_string(),
                    field: path::render(&segments),
                })
        }))
    }

    /// A scalar output field as text
    pub fn output_string(&self, field: &str) -> Result<Deferred<String>> {
        let node = self.id.clone();
        let field_name = field.to_string();
        Ok(self.output(field)?.try_map(move |value| match value {
            Value::String(text) => Ok(text),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(SkyError::OutputMissing {
                node: node.to_string(),
                field: format!("{} (not a scalar)", field_name),
            }),
        }))
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// A resource as held by the graph until the engine materializes it
pub struct ResourceNode {
    pub id: NodeId,
    pub spec: ResourceSpec,
    pub target: Target,
    /// Direct upstream entries (inputs, binding, explicit `depends_on`)
    pub dependencies: Dependencies,
    pub(crate) resolver: Resolver<Value>,
}

impl ResourceNode {
    pub fn kind(&self) -> ResourceKind {
        self.spec.kind()
    }
}

impl fmt::Debug for ResourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceNode")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("target", &self.target)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
