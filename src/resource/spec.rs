//! Typed resource arguments, one structure per kind
//!
//! Arguments are validated when a node is declared so shape errors surface
//! before any provider is called. `render` resolves every input and produces
//! the provider-facing property document (camelCase, as the APIs expect).

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::error::SkyError;
use crate::output::{Dependencies, Resolution};

use super::input::Input;
use super::kind::ResourceKind;

/// `/subscriptions/.../userAssignedIdentities/<name>` → `{}`
pub type IdentityMap = BTreeMap<String, Value>;

pub type Labels = BTreeMap<String, String>;

// ═══════════════════════════════════════════════════════════════
// CLOUD CONTROL PLANE
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ResourceGroupArgs {
    /// Provider default location when unset
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserAssignedIdentityArgs {
    pub resource_group_name: Input<String>,
    pub location: Option<Input<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPoolMode {
    System,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Linux,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPoolType {
    VirtualMachineScaleSets,
    AvailabilitySet,
}

#[derive(Debug, Clone)]
pub struct AgentPoolProfile {
    pub name: String,
    pub count: u32,
    pub enable_node_public_ip: bool,
    pub mode: AgentPoolMode,
    pub os_type: OsType,
    pub pool_type: AgentPoolType,
    pub vm_size: String,
}

#[derive(Debug, Clone)]
pub enum ClusterIdentity {
    SystemAssigned,
    UserAssigned { identities: Input<IdentityMap> },
}

#[derive(Debug, Clone)]
pub struct LinuxProfile {
    pub admin_username: String,
    pub ssh_public_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalancerSku {
    Basic,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundType {
    LoadBalancer,
    UserDefinedRouting,
}

#[derive(Debug, Clone)]
pub struct NetworkProfile {
    pub load_balancer_sku: LoadBalancerSku,
    pub outbound_type: OutboundType,
    pub managed_outbound_ip_count: u32,
}

#[derive(Debug, Clone)]
pub struct ManagedClusterArgs {
    pub resource_group_name: Input<String>,
    pub location: Input<String>,
    pub dns_prefix: String,
    pub enable_rbac: bool,
    pub agent_pool_profiles: Vec<AgentPoolProfile>,
    pub identity: ClusterIdentity,
    pub linux_profile: LinuxProfile,
    pub network_profile: NetworkProfile,
}

// ═══════════════════════════════════════════════════════════════
// CLUSTER WORKLOADS
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ObjectMeta {
    /// Explicit object name; auto-named by the provider when unset
    pub name: Option<String>,
    pub labels: Labels,
}

#[derive(Debug, Clone)]
pub struct ConfigMapArgs {
    pub metadata: ObjectMeta,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    pub sub_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone)]
pub enum VolumeSource {
    ConfigMap { name: Input<String> },
    EmptyDir,
}

#[derive(Debug, Clone)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
}

#[derive(Debug, Clone)]
pub struct PodTemplate {
    pub labels: Labels,
    pub containers: Vec<Container>,
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone)]
pub struct DeploymentArgs {
    pub metadata: ObjectMeta,
    pub replicas: u32,
    pub selector: Labels,
    pub template: PodTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePort {
    pub port: u16,
    pub target_port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    ClusterIp,
    NodePort,
    LoadBalancer,
}

#[derive(Debug, Clone)]
pub struct ServiceArgs {
    pub metadata: ObjectMeta,
    pub selector: Labels,
    pub ports: Vec<ServicePort>,
    pub service_type: ServiceType,
}

// ═══════════════════════════════════════════════════════════════
// TAGGED SPEC
// ═══════════════════════════════════════════════════════════════

/// Arguments of a resource node, tagged by kind
#[derive(Debug, Clone)]
pub enum ResourceSpec {
    ResourceGroup(ResourceGroupArgs),
    ManagedIdentity(UserAssignedIdentityArgs),
    ManagedCluster(Box<ManagedClusterArgs>),
    ConfigMap(ConfigMapArgs),
    Deployment(DeploymentArgs),
    Service(ServiceArgs),
}

impl From<ResourceGroupArgs> for ResourceSpec {
    fn from(args: ResourceGroupArgs) -> Self {
        Self::ResourceGroup(args)
    }
}

impl From<UserAssignedIdentityArgs> for ResourceSpec {
    fn from(args: UserAssignedIdentityArgs) -> Self {
        Self::ManagedIdentity(args)
    }
}

impl From<ManagedClusterArgs> for ResourceSpec {
    fn from(args: ManagedClusterArgs) -> Self {
        Self::ManagedCluster(Box::new(args))
    }
}

impl From<ConfigMapArgs> for ResourceSpec {
    fn from(args: ConfigMapArgs) -> Self {
        Self::ConfigMap(args)
    }
}

impl From<DeploymentArgs> for ResourceSpec {
    fn from(args: DeploymentArgs) -> Self {
        Self::Deployment(args)
    }
}

impl From<ServiceArgs> for ResourceSpec {
    fn from(args: ServiceArgs) -> Self {
        Self::Service(args)
    }
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::ResourceGroup(_) => ResourceKind::ResourceGroup,
            Self::ManagedIdentity(_) => ResourceKind::ManagedIdentity,
            Self::ManagedCluster(_) => ResourceKind::ManagedCluster,
            Self::ConfigMap(_) => ResourceKind::ConfigMap,
            Self::Deployment(_) => ResourceKind::Deployment,
            Self::Service(_) => ResourceKind::Service,
        }
    }

    /// Upstream entries referenced by any input of this spec
    pub fn dependencies(&self) -> Dependencies {
        match self {
            Self::ResourceGroup(_) | Self::ConfigMap(_) | Self::Service(_) => Dependencies::none(),
            Self::ManagedIdentity(args) => {
                let deps = args.resource_group_name.dependencies();
                match &args.location {
                    Some(location) => deps.union(&location.dependencies()),
                    None => deps,
                }
            }
            Self::ManagedCluster(args) => {
                let deps = args
                    .resource_group_name
                    .dependencies()
                    .union(&args.location.dependencies());
                match &args.identity {
                    ClusterIdentity::UserAssigned { identities } => {
                        deps.union(&identities.dependencies())
                    }
                    ClusterIdentity::SystemAssigned => deps,
                }
            }
            Self::Deployment(args) => args
                .template
                .volumes
                .iter()
                .fold(Dependencies::none(), |deps, volume| match &volume.source {
                    VolumeSource::ConfigMap { name } => deps.union(&name.dependencies()),
                    VolumeSource::EmptyDir => deps,
                }),
        }
    }

    /// Check the arguments without resolving any input
    pub fn validate(&self, node: &str) -> Result<(), SkyError> {
        let invalid = |reason: String| SkyError::InvalidSpec {
            node: node.to_string(),
            reason,
        };

        match self {
            Self::ResourceGroup(args) => {
                if args.location.as_deref() == Some("") {
                    return Err(invalid("location cannot be empty".into()));
                }
            }
            Self::ManagedIdentity(args) => {
                if args.resource_group_name.as_literal().is_some_and(String::is_empty) {
                    return Err(invalid("resource_group_name cannot be empty".into()));
                }
            }
            Self::ManagedCluster(args) => validate_cluster(args).map_err(invalid)?,
            Self::ConfigMap(args) => {
                validate_metadata(&args.metadata).map_err(invalid)?;
                for key in args.data.keys() {
                    if !is_config_key(key) {
                        return Err(invalid(format!(
                            "data key '{}' must be non-empty and use only letters, digits, '-', '_' or '.'",
                            key
                        )));
                    }
                }
            }
            Self::Deployment(args) => validate_deployment(args).map_err(invalid)?,
            Self::Service(args) => {
                validate_metadata(&args.metadata).map_err(invalid)?;
                if args.ports.is_empty() {
                    return Err(invalid("a service needs at least one port".into()));
                }
                if let Some(port) = args.ports.iter().find(|p| p.port == 0 || p.target_port == 0) {
                    return Err(invalid(format!(
                        "port {} -> {} is not a valid mapping",
                        port.port, port.target_port
                    )));
                }
                if args.selector.is_empty() {
                    return Err(invalid("service selector cannot be empty".into()));
                }
            }
        }
        Ok(())
    }

    /// Resolve every input and build the provider property document
    pub async fn render(&self) -> Resolution<Value> {
        match self {
            Self::ResourceGroup(args) => {
                let mut props = Map::new();
                if let Some(location) = &args.location {
                    props.insert("location".into(), json!(location));
                }
                Ok(Value::Object(props))
            }
            Self::ManagedIdentity(args) => {
                let mut props = Map::new();
                props.insert(
                    "resourceGroupName".into(),
                    json!(args.resource_group_name.resolve().await?),
                );
                if let Some(location) = &args.location {
                    props.insert("location".into(), json!(location.resolve().await?));
                }
                Ok(Value::Object(props))
            }
            Self::ManagedCluster(args) => render_cluster(args).await,
            Self::ConfigMap(args) => Ok(json!({
                "metadata": render_metadata(&args.metadata),
                "data": args.data,
            })),
            Self::Deployment(args) => render_deployment(args).await,
            Self::Service(args) => Ok(json!({
                "metadata": render_metadata(&args.metadata),
                "spec": {
                    "type": match args.service_type {
                        ServiceType::ClusterIp => "ClusterIP",
                        ServiceType::NodePort => "NodePort",
                        ServiceType::LoadBalancer => "LoadBalancer",
                    },
                    "selector": args.selector,
                    "ports": args.ports.iter().map(|p| json!({
                        "port": p.port,
                        "targetPort": p.target_port,
                        "protocol": match p.protocol {
                            Protocol::Tcp => "TCP",
                            Protocol::Udp => "UDP",
                        },
                    })).collect::<Vec<_>>(),
                },
            })),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// VALIDATION HELPERS
// ═══════════════════════════════════════════════════════════════

fn validate_cluster(args: &ManagedClusterArgs) -> Result<(), String> {
    if args.dns_prefix.is_empty()
        || args.dns_prefix.len() > 54
        || !args
            .dns_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(format!(
            "dns_prefix '{}' must be 1-54 alphanumeric characters or '-'",
            args.dns_prefix
        ));
    }

    if args.agent_pool_profiles.is_empty() {
        return Err("at least one agent pool is required".into());
    }
    for pool in &args.agent_pool_profiles {
        if pool.name.is_empty()
            || pool.name.len() > 12
            || !pool.name.starts_with(|c: char| c.is_ascii_lowercase())
            || !pool
                .name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(format!(
                "agent pool name '{}' must be 1-12 lowercase letters or digits, starting with a letter",
                pool.name
            ));
        }
        if pool.count == 0 {
            return Err(format!("agent pool '{}' needs at least one node", pool.name));
        }
        if pool.vm_size.is_empty() {
            return Err(format!("agent pool '{}' has no vm_size", pool.name));
        }
    }
    if !args
        .agent_pool_profiles
        .iter()
        .any(|p| p.mode == AgentPoolMode::System)
    {
        return Err("at least one agent pool must run in System mode".into());
    }

    if args.linux_profile.admin_username.is_empty() {
        return Err("linux admin_username cannot be empty".into());
    }
    if args.linux_profile.ssh_public_keys.is_empty() {
        return Err("linux profile needs at least one ssh public key".into());
    }
    if let Some(key) = args
        .linux_profile
        .ssh_public_keys
        .iter()
        .find(|k| !(k.starts_with("ssh-") || k.starts_with("ecdsa-")))
    {
        let shown: String = key.chars().take(16).collect();
        return Err(format!("'{}...' is not an OpenSSH public key", shown));
    }

    let outbound = args.network_profile.managed_outbound_ip_count;
    if args.network_profile.outbound_type == OutboundType::LoadBalancer {
        if !(1..=100).contains(&outbound) {
            return Err(format!(
                "managed outbound ip count must be between 1 and 100, got {}",
                outbound
            ));
        }
        if args.network_profile.load_balancer_sku != LoadBalancerSku::Standard {
            return Err("loadBalancer outbound type requires the standard load balancer sku".into());
        }
    }
    Ok(())
}

fn validate_deployment(args: &DeploymentArgs) -> Result<(), String> {
    validate_metadata(&args.metadata)?;
    if args.selector.is_empty() {
        return Err("deployment selector cannot be empty".into());
    }
    for (key, value) in &args.selector {
        if args.template.labels.get(key) != Some(value) {
            return Err(format!(
                "selector {}={} does not match the pod template labels",
                key, value
            ));
        }
    }
    if args.template.containers.is_empty() {
        return Err("pod template needs at least one container".into());
    }
    for container in &args.template.containers {
        if container.name.is_empty() || container.image.is_empty() {
            return Err("every container needs a name and an image".into());
        }
        for mount in &container.volume_mounts {
            if !args.template.volumes.iter().any(|v| v.name == mount.name) {
                return Err(format!(
                    "container '{}' mounts undeclared volume '{}'",
                    container.name, mount.name
                ));
            }
            if !mount.mount_path.starts_with('/') {
                return Err(format!(
                    "mount path '{}' must be absolute",
                    mount.mount_path
                ));
            }
        }
    }
    Ok(())
}

fn validate_metadata(metadata: &ObjectMeta) -> Result<(), String> {
    if let Some(name) = &metadata.name {
        let valid = !name.is_empty()
            && name.len() <= 253
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
        if !valid {
            return Err(format!("'{}' is not a valid object name", name));
        }
    }
    if metadata.labels.keys().any(String::is_empty) {
        return Err("label keys cannot be empty".into());
    }
    Ok(())
}

fn is_config_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

// ═══════════════════════════════════════════════════════════════
// RENDERING HELPERS
// ═══════════════════════════════════════════════════════════════

fn render_metadata(metadata: &ObjectMeta) -> Value {
    let mut meta = Map::new();
    if let Some(name) = &metadata.name {
        meta.insert("name".into(), json!(name));
    }
    meta.insert("labels".into(), json!(metadata.labels));
    Value::Object(meta)
}

async fn render_cluster(args: &ManagedClusterArgs) -> Resolution<Value> {
    let resource_group_name = args.resource_group_name.resolve().await?;
    let location = args.location.resolve().await?;
    let identity = match &args.identity {
        ClusterIdentity::SystemAssigned => json!({ "type": "SystemAssigned" }),
        ClusterIdentity::UserAssigned { identities } => json!({
            "type": "UserAssigned",
            "userAssignedIdentities": identities.resolve().await?,
        }),
    };

    let pools: Vec<Value> = args
        .agent_pool_profiles
        .iter()
        .map(|pool| {
            json!({
                "name": pool.name,
                "count": pool.count,
                "enableNodePublicIP": pool.enable_node_public_ip,
                "mode": match pool.mode {
                    AgentPoolMode::System => "System",
                    AgentPoolMode::User => "User",
                },
                "osType": match pool.os_type {
                    OsType::Linux => "Linux",
                    OsType::Windows => "Windows",
                },
                "type": match pool.pool_type {
                    AgentPoolType::VirtualMachineScaleSets => "VirtualMachineScaleSets",
                    AgentPoolType::AvailabilitySet => "AvailabilitySet",
                },
                "vmSize": pool.vm_size,
            })
        })
        .collect();

    Ok(json!({
        "resourceGroupName": resource_group_name,
        "location": location,
        "dnsPrefix": args.dns_prefix,
        "enableRBAC": args.enable_rbac,
        "agentPoolProfiles": pools,
        "identity": identity,
        "linuxProfile": {
            "adminUsername": args.linux_profile.admin_username,
            "ssh": {
                "publicKeys": args
                    .linux_profile
                    .ssh_public_keys
                    .iter()
                    .map(|key| json!({ "keyData": key }))
                    .collect::<Vec<_>>(),
            },
        },
        "networkProfile": {
            "loadBalancerSku": match args.network_profile.load_balancer_sku {
                LoadBalancerSku::Basic => "basic",
                LoadBalancerSku::Standard => "standard",
            },
            "outboundType": match args.network_profile.outbound_type {
                OutboundType::LoadBalancer => "loadBalancer",
                OutboundType::UserDefinedRouting => "userDefinedRouting",
            },
            "loadBalancerProfile": {
                "managedOutboundIPs": { "count": args.network_profile.managed_outbound_ip_count },
            },
        },
    }))
}

async fn render_deployment(args: &DeploymentArgs) -> Resolution<Value> {
    let mut volumes = Vec::with_capacity(args.template.volumes.len());
    for volume in &args.template.volumes {
        let source = match &volume.source {
            VolumeSource::ConfigMap { name } => json!({
                "name": volume.name,
                "configMap": { "name": name.resolve().await? },
            }),
            VolumeSource::EmptyDir => json!({ "name": volume.name, "emptyDir": {} }),
        };
        volumes.push(source);
    }

    let containers: Vec<Value> = args
        .template
        .containers
        .iter()
        .map(|container| {
            json!({
                "name": container.name,
                "image": container.image,
                "volumeMounts": container.volume_mounts.iter().map(|mount| {
                    let mut m = json!({ "name": mount.name, "mountPath": mount.mount_path });
                    if let Some(sub_path) = &mount.sub_path {
                        m["subPath"] = json!(sub_path);
                    }
                    m
                }).collect::<Vec<_>>(),
            })
        })
        .collect();

    Ok(json!({
        "metadata": render_metadata(&args.metadata),
        "spec": {
            "replicas": args.replicas,
            "selector": { "matchLabels": args.selector },
            "template": {
                "metadata": { "labels": args.template.labels },
                "spec": {
                    "containers": containers,
                    "volumes": volumes,
                },
            },
        },
    }))
}
