//! Resource kinds known to the graph

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    ResourceGroup,
    ManagedIdentity,
    ManagedCluster,
    ConfigMap,
    Deployment,
    Service,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::ResourceGroup,
        ResourceKind::ManagedIdentity,
        ResourceKind::ManagedCluster,
        ResourceKind::ConfigMap,
        ResourceKind::Deployment,
        ResourceKind::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceGroup => "resource-group",
            Self::ManagedIdentity => "managed-identity",
            Self::ManagedCluster => "managed-cluster",
            Self::ConfigMap => "config-map",
            Self::Deployment => "deployment",
            Self::Service => "service",
        }
    }

    /// Provider type token, as reported in previews and events
    pub fn type_token(&self) -> &'static str {
        match self {
            Self::ResourceGroup => "azure-native:resources:ResourceGroup",
            Self::ManagedIdentity => "azure-native:managedidentity:UserAssignedIdentity",
            Self::ManagedCluster => "azure-native:containerservice:ManagedCluster",
            Self::ConfigMap => "kubernetes:core/v1:ConfigMap",
            Self::Deployment => "kubernetes:apps/v1:Deployment",
            Self::Service => "kubernetes:core/v1:Service",
        }
    }

    /// Kinds realized inside a Kubernetes cluster rather than the cloud control plane
    pub fn is_cluster_workload(&self) -> bool {
        matches!(self, Self::ConfigMap | Self::Deployment | Self::Service)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
