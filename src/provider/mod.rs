//! # Provider Abstraction Layer
//!
//! Traits the engine drives to realize resources, plus in-memory mocks.
//!
//! ## Overview
//!
//! - [`ResourceProvider`] - create / read / delete for the kinds it handles
//! - [`CloudProvider`] - the cloud control plane: also answers lookups
//! - [`ClusterConnector`] - turns a [`ProviderBinding`] into a provider
//!   scoped to that cluster
//!
//! ## Routing
//!
//! | Target | Kinds | Provider |
//! |--------|-------|----------|
//! | default | cloud kinds | the cloud provider |
//! | default | cluster workloads | the ambient cluster provider, if any |
//! | binding | any | only the provider the connector returned for it |
//!
//! Providers report failures through `anyhow`; the engine wraps them into
//! `ProviderOperation` errors naming the node and kind.

pub mod mock;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::binding::ProviderBinding;
use crate::credentials::CredentialResults;
use crate::graph::ClientConfig;
use crate::output::NodeId;
use crate::resource::ResourceKind;

pub use mock::{Ingress, MockCloudProvider, MockClusterProvider, MockConnector, ProviderCall};

/// Create a resource from its rendered properties
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub node: NodeId,
    pub kind: ResourceKind,
    pub properties: Value,
}

/// Read or delete an existing resource, identified by its outputs
#[derive(Debug, Clone)]
pub struct ResourceRef {
    pub node: NodeId,
    pub kind: ResourceKind,
    pub outputs: Value,
}

/// Realizes resources of the kinds it handles
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    fn name(&self) -> &str;

    fn handles(&self, kind: ResourceKind) -> bool;

    /// Create the resource; returns its outputs (at least `name`)
    async fn create(&self, request: CreateRequest) -> Result<Value>;

    /// Current live state of the resource
    async fn read(&self, resource: ResourceRef) -> Result<Value>;

    async fn delete(&self, resource: ResourceRef) -> Result<()>;
}

/// The cloud control plane
#[async_trait]
pub trait CloudProvider: ResourceProvider {
    /// `node` is the lookup entry issuing the query
    async fn client_config(&self, node: &str) -> Result<ClientConfig>;

    async fn list_cluster_user_credentials(
        &self,
        node: &str,
        resource_group: &str,
        cluster: &str,
    ) -> Result<CredentialResults>;
}

/// Builds providers scoped to a binding's cluster
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(&self, binding: &ProviderBinding) -> Result<Arc<dyn ResourceProvider>>;
}

/// The provider a node was routed to
#[derive(Clone)]
pub enum Route {
    Cloud(Arc<dyn CloudProvider>),
    Cluster(Arc<dyn ResourceProvider>),
}

impl Route {
    pub fn name(&self) -> &str {
        match self {
            Self::Cloud(p) => p.name(),
            Self::Cluster(p) => p.name(),
        }
    }

    pub fn handles(&self, kind: ResourceKind) -> bool {
        match self {
            Self::Cloud(p) => p.handles(kind),
            Self::Cluster(p) => p.handles(kind),
        }
    }

    pub async fn create(&self, request: CreateRequest) -> Result<Value> {
        match self {
            Self::Cloud(p) => p.create(request).await,
            Self::Cluster(p) => p.create(request).await,
        }
    }

    pub async fn read(&self, resource: ResourceRef) -> Result<Value> {
        match self {
            Self::Cloud(p) => p.read(resource).await,
            Self::Cluster(p) => p.read(resource).await,
        }
    }

    pub async fn delete(&self, resource: ResourceRef) -> Result<()> {
        match self {
            Self::Cloud(p) => p.delete(resource).await,
            Self::Cluster(p) => p.delete(resource).await,
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud(p) => write!(f, "Route::Cloud({})", p.name()),
            Self::Cluster(p) => write!(f, "Route::Cluster({})", p.name()),
        }
    }
}
