//! Lookups - read-only provider queries declared in the graph

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialResults;
use crate::output::{Dependencies, NodeId, Resolver};
use crate::resource::Input;

/// Account context of the cloud credentials in use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
}

/// The query a lookup performs, with the resolver for its result
pub enum LookupOp {
    ClientConfig {
        resolver: Resolver<ClientConfig>,
    },
    ClusterUserCredentials {
        resource_group: Input<String>,
        cluster: Input<String>,
        resolver: Resolver<CredentialResults>,
    },
}

impl LookupOp {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::ClientConfig { .. } => "client_config",
            Self::ClusterUserCredentials { .. } => "list_cluster_user_credentials",
        }
    }
}

pub struct LookupNode {
    pub id: NodeId,
    pub op: LookupOp,
    pub dependencies: Dependencies,
}

impl fmt::Debug for LookupNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupNode")
            .field("id", &self.id)
            .field("operation", &self.op.operation())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
