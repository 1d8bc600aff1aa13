//! The nginx-on-AKS stack
//!
//! ```text
//! resource_group ──► userAssignedIdentity ──┐
//!       │                                   ├─► identity map ──► managed_cluster
//!       │              client_config ───────┘                        │
//!       └──────────────────────────────► cluster_credentials ◄───────┘
//!                                              │ decode
//!                                              ▼
//!                                     inflation_provider (binding)
//!                                              │
//!                     nginx-html ──► nginx     nginx-lb ──► nginx-lb-status ──► frontend_IP
//! ```
//!
//! The transforms between entries are plain functions so they can be tested
//! without a graph.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::config::StackConfig;
use crate::credentials::decode_kubeconfig;
use crate::error::{Result, SkyError};
use crate::graph::{ClientConfig, Graph};
use crate::output::zip3;
use crate::resource::spec::{
    AgentPoolMode, AgentPoolProfile, AgentPoolType, ClusterIdentity, ConfigMapArgs, Container,
    DeploymentArgs, IdentityMap, Labels, LinuxProfile, LoadBalancerSku, ManagedClusterArgs,
    NetworkProfile, ObjectMeta, OsType, OutboundType, PodTemplate, Protocol, ResourceGroupArgs,
    ServiceArgs, ServicePort, ServiceType, UserAssignedIdentityArgs, Volume, VolumeMount,
    VolumeSource,
};
use crate::resource::ResourceOptions;

pub const STACK_NAME: &str = "nginx-aks";
pub const APP_NAME: &str = "nginx";
pub const NGINX_IMAGE: &str = "nginx:1.15-alpine";
pub const HTML_FILE: &str = "index.html";
pub const HTML_MOUNT_PATH: &str = "/usr/share/nginx/html/index.html";
pub const EXPORT_NAME: &str = "frontend_IP";
/// Live-status field that holds the load balancer address
pub const INGRESS_READY_PATH: &str = "status.loadBalancer.ingress[0]";

const HTML_VOLUME: &str = "nginx-html";
const BINDING_NAME: &str = "inflation_provider";

/// Everything the declaration needs from outside the process
#[derive(Debug, Clone)]
pub struct StackInputs {
    pub ssh_public_key: String,
    pub index_html: String,
}

impl StackInputs {
    /// Required config values, then the page to serve.
    ///
    /// A missing `sshPublicKey` fails before the html file is touched.
    pub fn from_config(config: &StackConfig, html_path: &Path) -> Result<Self> {
        let ssh_public_key = config.require("sshPublicKey")?.to_string();
        let index_html = fs::read_to_string(html_path).map_err(|e| SkyError::ConfigError {
            reason: format!("Failed to read {}: {}", html_path.display(), e),
        })?;
        Ok(Self {
            ssh_public_key,
            index_html,
        })
    }
}

/// `app: nginx`
pub fn app_labels() -> Labels {
    BTreeMap::from([("app".to_string(), APP_NAME.to_string())])
}

/// Cluster identity map: the identity's ARM id pointing at an empty object
pub fn user_assigned_identity_map(
    client: &ClientConfig,
    resource_group: &str,
    identity: &str,
) -> IdentityMap {
    let id = format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ManagedIdentity/userAssignedIdentities/{}",
        client.subscription_id, resource_group, identity
    );
    BTreeMap::from([(id, Value::Object(Default::default()))])
}

/// Address of the first load balancer ingress: its `ip`, else its `hostname`
pub fn ingress_address(node: &str, status: &Value) -> Result<Value> {
    let ingress = &status["status"]["loadBalancer"]["ingress"][0];
    ["ip", "hostname"]
        .iter()
        .find_map(|field| ingress.get(*field).filter(|v| v.is_string()).cloned())
        .ok_or_else(|| SkyError::OutputMissing {
            node: node.to_string(),
            field: "status.loadBalancer.ingress[0].ip".to_string(),
        })
}

/// Arguments of the managed cluster, minus its deferred inputs
fn cluster_args(inputs: &StackInputs) -> (Vec<AgentPoolProfile>, LinuxProfile, NetworkProfile) {
    let pools = vec![AgentPoolProfile {
        name: "nodepool".to_string(),
        count: 1,
        enable_node_public_ip: true,
        mode: AgentPoolMode::System,
        os_type: OsType::Linux,
        pool_type: AgentPoolType::VirtualMachineScaleSets,
        vm_size: "Standard_B2ms".to_string(),
    }];
    let linux = LinuxProfile {
        admin_username: "azureuser".to_string(),
        ssh_public_keys: vec![inputs.ssh_public_key.clone()],
    };
    let network = NetworkProfile {
        load_balancer_sku: LoadBalancerSku::Standard,
        outbound_type: OutboundType::LoadBalancer,
        managed_outbound_ip_count: 1,
    };
    (pools, linux, network)
}

/// Declare the whole stack. Nothing is created until the graph is materialized.
pub fn declare_nginx_stack(inputs: &StackInputs) -> Result<Graph> {
    let mut graph = Graph::new(STACK_NAME);

    let resource_group = graph.resource(
        "resource_group",
        ResourceGroupArgs::default(),
        ResourceOptions::new(),
    )?;
    let rg_name = resource_group.output_string("name")?;

    let identity = graph.resource(
        "userAssignedIdentity",
        UserAssignedIdentityArgs {
            resource_group_name: rg_name.clone().into(),
            location: None,
        },
        ResourceOptions::new(),
    )?;

    let client = graph.client_config("client_config")?;
    let identities = zip3(&client, &rg_name, &identity.output_string("name")?)
        .map(|(client, rg, id)| user_assigned_identity_map(&client, &rg, &id));

    let (agent_pool_profiles, linux_profile, network_profile) = cluster_args(inputs);
    let cluster = graph.resource(
        "managed_cluster",
        ManagedClusterArgs {
            resource_group_name: rg_name.clone().into(),
            location: resource_group.output_string("location")?.into(),
            dns_prefix: "dnsprefix".to_string(),
            enable_rbac: true,
            agent_pool_profiles,
            identity: ClusterIdentity::UserAssigned {
                identities: identities.into(),
            },
            linux_profile,
            network_profile,
        },
        ResourceOptions::new(),
    )?;

    let credentials = graph.cluster_user_credentials(
        "cluster_credentials",
        rg_name,
        cluster.output_string("name")?,
    )?;
    let descriptor = credentials.try_map(|results| decode_kubeconfig(BINDING_NAME, &results));
    let binding = graph.provider_binding(BINDING_NAME, &descriptor)?;
    let scoped = || ResourceOptions::new().provider(&binding);

    let labels = app_labels();
    let html = graph.resource(
        HTML_VOLUME,
        ConfigMapArgs {
            metadata: ObjectMeta {
                name: None,
                labels: labels.clone(),
            },
            data: BTreeMap::from([(HTML_FILE.to_string(), inputs.index_html.clone())]),
        },
        scoped(),
    )?;

    graph.resource(
        APP_NAME,
        DeploymentArgs {
            metadata: ObjectMeta {
                name: None,
                labels: labels.clone(),
            },
            replicas: 1,
            selector: labels.clone(),
            template: PodTemplate {
                labels: labels.clone(),
                containers: vec![Container {
                    name: APP_NAME.to_string(),
                    image: NGINX_IMAGE.to_string(),
                    volume_mounts: vec![VolumeMount {
                        name: HTML_VOLUME.to_string(),
                        mount_path: HTML_MOUNT_PATH.to_string(),
                        sub_path: Some(HTML_FILE.to_string()),
                    }],
                }],
                volumes: vec![Volume {
                    name: HTML_VOLUME.to_string(),
                    source: VolumeSource::ConfigMap {
                        name: html.output_string("metadata.name")?.into(),
                    },
                }],
            },
        },
        scoped(),
    )?;

    let service = graph.resource(
        "nginx-lb",
        ServiceArgs {
            metadata: ObjectMeta {
                name: None,
                labels: labels.clone(),
            },
            selector: labels,
            ports: vec![ServicePort {
                port: 80,
                target_port: 80,
                protocol: Protocol::Tcp,
            }],
            service_type: ServiceType::LoadBalancer,
        },
        scoped(),
    )?;

    let status = graph.watch_status(&service, INGRESS_READY_PATH)?;
    let service_name = service.name().to_string();
    graph.export(
        EXPORT_NAME,
        status.try_map(move |status| ingress_address(&service_name, &status)),
    )?;

    Ok(graph)
}
