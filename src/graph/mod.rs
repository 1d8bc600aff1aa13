//! Graph Module - declaration of a provisioning graph
//!
//! - `dag`: dependency structure, cycle detection, topological order
//! - `lookup`: read-only provider queries
//! - `validate`: logical name rules
//!
//! A [`Graph`] is pure declaration: every entry gets a resolver that the
//! engine fills in later, and a deferred handle the caller wires into
//! downstream inputs. Nothing touches a provider until
//! [`Engine::materialize`](crate::engine::Engine::materialize).
//!
//! Entries share one namespace:
//!
//! ```text
//! resource  → Resource (outputs: Deferred<Value>)
//! lookup    → Deferred<ClientConfig> | Deferred<CredentialResults>
//! binding   → BindingHandle (Deferred<Arc<ProviderBinding>>)
//! watch     → Deferred<Value> (live status once a field is populated)
//! ```
//!
//! Exports live in their own namespace and reference any deferred value.

pub mod dag;
pub mod lookup;
pub mod validate;

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::binding::{BindingHandle, ProviderBinding, Target};
use crate::credentials::{ConnectionDescriptor, CredentialResults};
use crate::error::{Result, SkyError};
use crate::output::{Deferred, Dependencies, NodeId, Resolver};
use crate::resource::{Input, Resource, ResourceKind, ResourceNode, ResourceOptions, ResourceSpec};
use crate::util::path::{self, Segment};

pub use dag::DependencyGraph;
pub use lookup::{ClientConfig, LookupNode, LookupOp};
pub use validate::validate_node_name;

/// What a graph entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Resource(ResourceKind),
    Lookup(&'static str),
    Binding,
    Watch,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(kind) => write!(f, "{}", kind),
            Self::Lookup(operation) => write!(f, "lookup:{}", operation),
            Self::Binding => f.write_str("binding"),
            Self::Watch => f.write_str("status-watch"),
        }
    }
}

/// One entry as shown in previews
#[derive(Debug, Clone)]
pub struct NodeSummary {
    pub id: NodeId,
    pub entry: EntryKind,
    pub target: String,
    pub dependencies: Dependencies,
}

/// Provider binding waiting for its connection descriptor
pub struct BindingNode {
    pub id: NodeId,
    pub descriptor: Deferred<ConnectionDescriptor>,
    pub dependencies: Dependencies,
    pub(crate) resolver: Resolver<Arc<ProviderBinding>>,
}

/// Poll of a resource's live status until `ready` is populated
pub struct WatchNode {
    pub id: NodeId,
    pub resource: NodeId,
    pub kind: ResourceKind,
    pub target: Target,
    pub ready: Vec<Segment>,
    pub dependencies: Dependencies,
    pub(crate) resolver: Resolver<Value>,
}

/// Named process output
#[derive(Clone)]
pub struct Export {
    pub name: Arc<str>,
    pub value: Deferred<Value>,
}

/// An unmaterialized provisioning graph
pub struct Graph {
    name: String,
    summaries: Vec<NodeSummary>,
    ids: FxHashSet<NodeId>,
    export_names: FxHashSet<Arc<str>>,
    resources: Vec<ResourceNode>,
    lookups: Vec<LookupNode>,
    bindings: Vec<BindingNode>,
    watches: Vec<WatchNode>,
    exports: Vec<Export>,
}

/// A graph split into what the engine schedules
pub(crate) struct GraphParts {
    pub name: String,
    pub summaries: Vec<NodeSummary>,
    pub resources: Vec<ResourceNode>,
    pub lookups: Vec<LookupNode>,
    pub bindings: Vec<BindingNode>,
    pub watches: Vec<WatchNode>,
    pub exports: Vec<Export>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summaries: Vec::new(),
            ids: FxHashSet::default(),
            export_names: FxHashSet::default(),
            resources: Vec::new(),
            lookups: Vec::new(),
            bindings: Vec::new(),
            watches: Vec::new(),
            exports: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries (exports excluded)
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn export_names(&self) -> Vec<&str> {
        self.exports.iter().map(|e| &*e.name).collect()
    }

    /// Check the name and edges of a new entry, then record it
    fn register(
        &mut self,
        name: &str,
        entry: EntryKind,
        target: &Target,
        dependencies: &Dependencies,
    ) -> Result<NodeId> {
        validate_node_name(name)?;
        let id = NodeId::new(name);
        if self.ids.contains(&id) {
            return Err(SkyError::DuplicateNode {
                name: name.to_string(),
            });
        }
        self.check_known(name, dependencies)?;

        self.ids.insert(id.clone());
        self.summaries.push(NodeSummary {
            id: id.clone(),
            entry,
            target: target.to_string(),
            dependencies: dependencies.clone(),
        });
        Ok(id)
    }

    fn check_known(&self, name: &str, dependencies: &Dependencies) -> Result<()> {
        match dependencies.iter().find(|dep| !self.ids.contains(*dep)) {
            Some(unknown) => Err(SkyError::UnknownDependency {
                node: name.to_string(),
                dependency: unknown.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Declare a resource. Its creation waits for every deferred input, the
    /// binding it is scoped to, and any explicit `depends_on` entry.
    pub fn resource(
        &mut self,
        name: &str,
        spec: impl Into<ResourceSpec>,
        options: ResourceOptions,
    ) -> Result<Resource> {
        let spec = spec.into();
        validate_node_name(name)?;
        spec.validate(name)?;

        let target = options.target();
        let mut dependencies = spec.dependencies();
        if let Some(binding) = target.binding_id() {
            dependencies = dependencies.union(&Dependencies::single(binding.clone()));
        }
        let explicit: Dependencies = options.depends_on.iter().cloned().collect();
        dependencies = dependencies.union(&explicit);

        let kind = spec.kind();
        let id = self.register(name, EntryKind::Resource(kind), &target, &dependencies)?;
        let (resolver, outputs) = Deferred::channel(name, Dependencies::single(id.clone()));
        self.resources.push(ResourceNode {
            id: id.clone(),
            spec,
            target,
            dependencies,
            resolver,
        });
        Ok(Resource::new(id, kind, outputs))
    }

    /// Account context (subscription, tenant) of the cloud provider
    pub fn client_config(&mut self, name: &str) -> Result<Deferred<ClientConfig>> {
        let op_name = "client_config";
        let id = self.register(
            name,
            EntryKind::Lookup(op_name),
            &Target::Default,
            &Dependencies::none(),
        )?;
        let (resolver, value) = Deferred::channel(name, Dependencies::single(id.clone()));
        self.lookups.push(LookupNode {
            id,
            op: LookupOp::ClientConfig { resolver },
            dependencies: Dependencies::none(),
        });
        Ok(value)
    }

    /// User credentials of a managed cluster
    pub fn cluster_user_credentials(
        &mut self,
        name: &str,
        resource_group: impl Into<Input<String>>,
        cluster: impl Into<Input<String>>,
    ) -> Result<Deferred<CredentialResults>> {
        let resource_group = resource_group.into();
        let cluster = cluster.into();
        let dependencies = resource_group.dependencies().union(&cluster.dependencies());

        let id = self.register(
            name,
            EntryKind::Lookup("list_cluster_user_credentials"),
            &Target::Default,
            &dependencies,
        )?;
        let (resolver, value) = Deferred::channel(name, Dependencies::single(id.clone()));
        self.lookups.push(LookupNode {
            id,
            op: LookupOp::ClusterUserCredentials {
                resource_group,
                cluster,
                resolver,
            },
            dependencies,
        });
        Ok(value)
    }

    /// Declare a binding configured from a deferred connection descriptor
    pub fn provider_binding(
        &mut self,
        name: &str,
        descriptor: &Deferred<ConnectionDescriptor>,
    ) -> Result<BindingHandle> {
        let dependencies = descriptor.dependencies().clone();
        let id = self.register(name, EntryKind::Binding, &Target::Default, &dependencies)?;
        let (resolver, binding) = Deferred::channel(name, Dependencies::single(id.clone()));
        self.bindings.push(BindingNode {
            id: id.clone(),
            descriptor: descriptor.clone(),
            dependencies,
            resolver,
        });
        Ok(BindingHandle::new(id, binding))
    }

    /// Live status of `resource`, available once `ready_path` is populated.
    ///
    /// The entry is named `<resource>-status`.
    pub fn watch_status(&mut self, resource: &Resource, ready_path: &str) -> Result<Deferred<Value>> {
        let ready = path::parse(ready_path)?;
        let node = self
            .resources
            .iter()
            .find(|r| &r.id == resource.id())
            .ok_or_else(|| SkyError::UnknownDependency {
                node: format!("{}-status", resource.name()),
                dependency: resource.name().to_string(),
            })?;
        let target = node.target.clone();

        let name = format!("{}-status", resource.name());
        let dependencies = Dependencies::single(resource.id().clone());
        let id = self.register(&name, EntryKind::Watch, &target, &dependencies)?;
        let (resolver, status) = Deferred::channel(&name, Dependencies::single(id.clone()));
        self.watches.push(WatchNode {
            id,
            resource: resource.id().clone(),
            kind: resource.kind(),
            target,
            ready,
            dependencies,
            resolver,
        });
        Ok(status)
    }

    /// Publish a deferred value as a named process output
    pub fn export(&mut self, name: &str, value: Deferred<Value>) -> Result<()> {
        validate_node_name(name)?;
        self.check_known(name, value.dependencies())?;
        let name: Arc<str> = Arc::from(name);
        if !self.export_names.insert(Arc::clone(&name)) {
            return Err(SkyError::DuplicateNode {
                name: name.to_string(),
            });
        }
        self.exports.push(Export { name, value });
        Ok(())
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_entries(
            self.summaries
                .iter()
                .map(|s| (s.id.clone(), s.dependencies.clone())),
        )
    }

    /// Entries in dependency order, for previews
    pub fn describe(&self) -> Result<Vec<NodeSummary>> {
        let order = self.dependency_graph().topological_order()?;
        Ok(order
            .iter()
            .filter_map(|id| self.summaries.iter().find(|s| &s.id == id).cloned())
            .collect())
    }

    pub(crate) fn into_parts(self) -> GraphParts {
        GraphParts {
            name: self.name,
            summaries: self.summaries,
            resources: self.resources,
            lookups: self.lookups,
            bindings: self.bindings,
            watches: self.watches,
            exports: self.exports,
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("entries", &self.summaries.len())
            .field("exports", &self.export_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::spec::{ResourceGroupArgs, UserAssignedIdentityArgs};

    fn rg(graph: &mut Graph, name: &str) -> Resource {
        graph
            .resource(name, ResourceGroupArgs::default(), ResourceOptions::new())
            .unwrap()
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut graph = Graph::new("test");
        rg(&mut graph, "resource_group");
        let err = graph
            .resource("resource_group", ResourceGroupArgs::default(), ResourceOptions::new())
            .unwrap_err();
        assert_eq!(err.code(), "SKY-011");

        // Lookups share the namespace
        assert!(graph.client_config("resource_group").is_err());
    }

    #[test]
    fn invalid_name_is_rejected_before_registration() {
        let mut graph = Graph::new("test");
        let err = graph
            .resource("1rg", ResourceGroupArgs::default(), ResourceOptions::new())
            .unwrap_err();
        assert_eq!(err.code(), "SKY-010");
        assert!(graph.is_empty());
    }

    #[test]
    fn inputs_create_edges() {
        let mut graph = Graph::new("test");
        let group = rg(&mut graph, "resource_group");
        graph
            .resource(
                "identity",
                UserAssignedIdentityArgs {
                    resource_group_name: group.output_string("name").unwrap().into(),
                    location: None,
                },
                ResourceOptions::new(),
            )
            .unwrap();

        let dag = graph.dependency_graph();
        assert!(dag.has_path("resource_group", "identity"));
        assert_eq!(dag.get_dependencies("identity")[0].as_str(), "resource_group");
    }

    #[test]
    fn depends_on_adds_explicit_edge() {
        let mut graph = Graph::new("test");
        let first = rg(&mut graph, "first");
        graph
            .resource(
                "second",
                ResourceGroupArgs::default(),
                ResourceOptions::new().depends_on(&first),
            )
            .unwrap();
        let order: Vec<String> = graph
            .describe()
            .unwrap()
            .iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(order, vec!["first", "second"]);
    }

    #[test]
    fn handles_from_another_graph_are_unknown() {
        let mut other = Graph::new("other");
        let foreign = rg(&mut other, "foreign");

        let mut graph = Graph::new("test");
        let err = graph
            .resource(
                "identity",
                UserAssignedIdentityArgs {
                    resource_group_name: foreign.output_string("name").unwrap().into(),
                    location: None,
                },
                ResourceOptions::new(),
            )
            .unwrap_err();
        assert_eq!(err.code(), "SKY-013");
        assert!(graph.watch_status(&foreign, "name").is_err());
    }

    #[test]
    fn watch_is_named_after_resource() {
        let mut graph = Graph::new("test");
        let group = rg(&mut graph, "resource_group");
        let status = graph.watch_status(&group, "properties.provisioningState").unwrap();
        assert!(status.dependencies().contains("resource_group-status"));
        let summary = graph.describe().unwrap();
        assert_eq!(summary[1].entry, EntryKind::Watch);
        assert!(summary[1].dependencies.contains("resource_group"));
    }

    #[test]
    fn exports_must_be_unique() {
        let mut graph = Graph::new("test");
        let group = rg(&mut graph, "resource_group");
        graph.export("rg_name", group.output("name").unwrap()).unwrap();
        let err = graph.export("rg_name", group.output("name").unwrap()).unwrap_err();
        assert_eq!(err.code(), "SKY-011");
        assert_eq!(graph.export_names(), vec!["rg_name"]);
    }

    #[test]
    fn entry_kind_display() {
        assert_eq!(EntryKind::Resource(ResourceKind::Service).to_string(), "service");
        assert_eq!(EntryKind::Lookup("client_config").to_string(), "lookup:client_config");
    }
}
