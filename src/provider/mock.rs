//! Mock providers for testing and local simulation
//!
//! Realize resources in memory without calling any cloud API.
//! - [`MockCloudProvider`]: resource groups, identities, managed clusters
//!   and the account/credential lookups
//! - [`MockClusterProvider`]: config maps, deployments and services, with a
//!   load balancer that reports its ingress only after a few status reads
//! - [`MockConnector`]: hands out one shared cluster provider per binding
//!
//! Every call is recorded for assertions.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde_json::{json, Value};

use super::{CloudProvider, ClusterConnector, CreateRequest, ResourceProvider, ResourceRef};
use crate::binding::ProviderBinding;
use crate::credentials::{CredentialBundle, CredentialResults};
use crate::graph::ClientConfig;
use crate::resource::ResourceKind;
use crate::util::NAME_SUFFIX_LEN;

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub provider: String,
    pub operation: String,
    pub node: String,
}

/// How physical names are derived from logical ones
#[derive(Debug, Clone)]
enum Naming {
    Random,
    Fixed(String),
}

impl Naming {
    fn suffix(&self) -> String {
        match self {
            Self::Random => random_hex(NAME_SUFFIX_LEN),
            Self::Fixed(suffix) => suffix.clone(),
        }
    }
}

fn random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}

/// Recursively overlay `patch` onto `base` (objects merge, anything else replaces)
fn merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(base.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

fn str_prop<'a>(properties: &'a Value, field: &str) -> Option<&'a str> {
    properties.get(field).and_then(Value::as_str)
}

/// Shared failure/delay scripting for both mocks
#[derive(Debug, Default)]
struct Script {
    failures: FxHashMap<String, String>,
    delays: FxHashMap<String, Duration>,
}

impl Script {
    async fn before(&self, node: &str) -> Result<()> {
        if let Some(delay) = self.delays.get(node) {
            tokio::time::sleep(*delay).await;
        }
        match self.failures.get(node) {
            Some(reason) => Err(anyhow!("{}", reason)),
            None => Ok(()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// CLOUD CONTROL PLANE
// ═══════════════════════════════════════════════════════════════

/// In-memory cloud control plane
pub struct MockCloudProvider {
    naming: Naming,
    client: ClientConfig,
    location: String,
    overrides: FxHashMap<String, Value>,
    script: Script,
    credentials: Option<CredentialResults>,
    resources: Mutex<FxHashMap<String, Value>>,
    /// (resource group, cluster name) -> API server FQDN
    clusters: Mutex<FxHashMap<(String, String), String>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl MockCloudProvider {
    pub fn new() -> Self {
        Self {
            naming: Naming::Random,
            client: ClientConfig {
                subscription_id: "00000000-0000-0000-0000-000000000001".to_string(),
                tenant_id: "00000000-0000-0000-0000-0000000000aa".to_string(),
                client_id: "00000000-0000-0000-0000-0000000000cc".to_string(),
            },
            location: "westus2".to_string(),
            overrides: FxHashMap::default(),
            script: Script::default(),
            credentials: None,
            resources: Mutex::new(FxHashMap::default()),
            clusters: Mutex::new(FxHashMap::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Use `suffix` instead of a random one when auto-naming
    pub fn with_fixed_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.naming = Naming::Fixed(suffix.into());
        self
    }

    pub fn with_subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.client.subscription_id = subscription_id.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Merge `outputs` into whatever the mock reports for `node`
    pub fn with_outputs(mut self, node: &str, outputs: Value) -> Self {
        self.overrides.insert(node.to_string(), outputs);
        self
    }

    /// Fail every operation on `node` (creates and lookups alike; lookups
    /// match by entry name)
    pub fn with_failure(mut self, node: &str, reason: impl Into<String>) -> Self {
        self.script.failures.insert(node.to_string(), reason.into());
        self
    }

    pub fn with_delay(mut self, node: &str, delay: Duration) -> Self {
        self.script.delays.insert(node.to_string(), delay);
        self
    }

    /// Scripted result for `list_cluster_user_credentials`
    pub fn with_credentials(mut self, credentials: CredentialResults) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Outputs of a created (and not deleted) node
    pub fn created(&self, node: &str) -> Option<Value> {
        self.resources.lock().get(node).cloned()
    }

    fn record(&self, operation: &str, node: &str) {
        self.calls.lock().push(ProviderCall {
            provider: self.name().to_string(),
            operation: operation.to_string(),
            node: node.to_string(),
        });
    }

    fn resource_id(&self, resource_group: &str, tail: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}{}",
            self.client.subscription_id, resource_group, tail
        )
    }

    fn realize(&self, request: &CreateRequest) -> Result<Value> {
        let props = &request.properties;
        let name = format!("{}{}", request.node, self.naming.suffix());
        let location = str_prop(props, "location").unwrap_or(&self.location).to_string();

        let outputs = match request.kind {
            ResourceKind::ResourceGroup => json!({
                "name": name,
                "location": location,
                "id": self.resource_id(&name, ""),
                "properties": { "provisioningState": "Succeeded" },
            }),
            ResourceKind::ManagedIdentity => {
                let rg = str_prop(props, "resourceGroupName")
                    .ok_or_else(|| anyhow!("resourceGroupName is required"))?;
                json!({
                    "name": name,
                    "resourceGroupName": rg,
                    "location": location,
                    "id": self.resource_id(
                        rg,
                        &format!("/providers/Microsoft.ManagedIdentity/userAssignedIdentities/{}", name),
                    ),
                    "principalId": random_hex(32),
                    "clientId": random_hex(32),
                })
            }
            ResourceKind::ManagedCluster => {
                let rg = str_prop(props, "resourceGroupName")
                    .ok_or_else(|| anyhow!("resourceGroupName is required"))?;
                let dns_prefix = str_prop(props, "dnsPrefix").unwrap_or("aks");
                let fqdn = format!(
                    "{}-{}.hcp.{}.azmk8s.io",
                    dns_prefix,
                    random_hex(NAME_SUFFIX_LEN),
                    location
                );
                self.clusters
                    .lock()
                    .insert((rg.to_string(), name.clone()), fqdn.clone());
                json!({
                    "name": name,
                    "resourceGroupName": rg,
                    "location": location,
                    "id": self.resource_id(
                        rg,
                        &format!("/providers/Microsoft.ContainerService/managedClusters/{}", name),
                    ),
                    "fqdn": fqdn,
                    "kubernetesVersion": "1.29.4",
                    "identity": props.get("identity").cloned().unwrap_or(Value::Null),
                    "properties": { "provisioningState": "Succeeded" },
                })
            }
            other => bail!("cloud provider cannot create {}", other),
        };
        Ok(outputs)
    }

    fn kubeconfig(resource_group: &str, cluster: &str, fqdn: &str) -> String {
        let user = format!("clusterUser_{}_{}", resource_group, cluster);
        format!(
            "apiVersion: v1\n\
             kind: Config\n\
             current-context: {cluster}\n\
             clusters:\n\
             - name: {cluster}\n  \
               cluster:\n    \
                 server: https://{fqdn}:443\n\
             users:\n\
             - name: {user}\n  \
               user:\n    \
                 token: {token}\n\
             contexts:\n\
             - name: {cluster}\n  \
               context:\n    \
                 cluster: {cluster}\n    \
                 user: {user}\n",
            cluster = cluster,
            fqdn = fqdn,
            user = user,
            token = random_hex(64),
        )
    }
}

impl Default for MockCloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceProvider for MockCloudProvider {
    fn name(&self) -> &str {
        "mock-azure"
    }

    fn handles(&self, kind: ResourceKind) -> bool {
        !kind.is_cluster_workload()
    }

    async fn create(&self, request: CreateRequest) -> Result<Value> {
        self.record("create", request.node.as_str());
        self.script.before(request.node.as_str()).await?;

        let mut outputs = self.realize(&request)?;
        if let Some(patch) = self.overrides.get(request.node.as_str()) {
            merge(&mut outputs, patch);
        }
        self.resources
            .lock()
            .insert(request.node.to_string(), outputs.clone());
        Ok(outputs)
    }

    async fn read(&self, resource: ResourceRef) -> Result<Value> {
        self.record("read", resource.node.as_str());
        self.resources
            .lock()
            .get(resource.node.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("'{}' does not exist", resource.node))
    }

    async fn delete(&self, resource: ResourceRef) -> Result<()> {
        self.record("delete", resource.node.as_str());
        match self.resources.lock().remove(resource.node.as_str()) {
            Some(_) => Ok(()),
            None => bail!("'{}' does not exist", resource.node),
        }
    }
}

#[async_trait]
impl CloudProvider for MockCloudProvider {
    async fn client_config(&self, node: &str) -> Result<ClientConfig> {
        self.record("client_config", node);
        self.script.before(node).await?;
        Ok(self.client.clone())
    }

    async fn list_cluster_user_credentials(
        &self,
        node: &str,
        resource_group: &str,
        cluster: &str,
    ) -> Result<CredentialResults> {
        self.record("list_cluster_user_credentials", node);
        self.script.before(node).await?;
        if let Some(scripted) = &self.credentials {
            return Ok(scripted.clone());
        }

        let fqdn = self
            .clusters
            .lock()
            .get(&(resource_group.to_string(), cluster.to_string()))
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "managed cluster '{}' not found in resource group '{}'",
                    cluster,
                    resource_group
                )
            })?;
        Ok(CredentialResults {
            kubeconfigs: vec![CredentialBundle::encode(
                "clusterUser",
                &Self::kubeconfig(resource_group, cluster, &fqdn),
            )],
        })
    }
}

// ═══════════════════════════════════════════════════════════════
// CLUSTER WORKLOADS
// ═══════════════════════════════════════════════════════════════

/// Address a mock load balancer eventually reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingress {
    Ip(String),
    Hostname(String),
}

/// In-memory Kubernetes API
pub struct MockClusterProvider {
    naming: Naming,
    pending_polls: u32,
    ingress: Ingress,
    script: Script,
    objects: Mutex<FxHashMap<String, Value>>,
    polls: Mutex<FxHashMap<String, u32>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl MockClusterProvider {
    pub fn new() -> Self {
        Self {
            naming: Naming::Random,
            pending_polls: 1,
            ingress: Ingress::Ip("20.81.10.7".to_string()),
            script: Script::default(),
            objects: Mutex::new(FxHashMap::default()),
            polls: Mutex::new(FxHashMap::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fixed_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.naming = Naming::Fixed(suffix.into());
        self
    }

    /// Number of status reads that see no ingress yet
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Never report an ingress address
    pub fn never_ready(mut self) -> Self {
        self.pending_polls = u32::MAX;
        self
    }

    pub fn with_ingress(mut self, ingress: Ingress) -> Self {
        self.ingress = ingress;
        self
    }

    pub fn with_failure(mut self, node: &str, reason: impl Into<String>) -> Self {
        self.script.failures.insert(node.to_string(), reason.into());
        self
    }

    pub fn with_delay(mut self, node: &str, delay: Duration) -> Self {
        self.script.delays.insert(node.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    pub fn created(&self, node: &str) -> Option<Value> {
        self.objects.lock().get(node).cloned()
    }

    /// Status reads so far for `node`
    pub fn polls(&self, node: &str) -> u32 {
        self.polls.lock().get(node).copied().unwrap_or(0)
    }

    fn record(&self, operation: &str, node: &str) {
        self.calls.lock().push(ProviderCall {
            provider: self.name().to_string(),
            operation: operation.to_string(),
            node: node.to_string(),
        });
    }

    fn config_map_exists(&self, name: &str) -> bool {
        self.objects.lock().values().any(|object| {
            object["kind"] == "ConfigMap" && object["metadata"]["name"].as_str() == Some(name)
        })
    }

    fn realize(&self, request: &CreateRequest) -> Result<Value> {
        let props = &request.properties;
        let name = props["metadata"]["name"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", request.node, self.naming.suffix()));
        let mut metadata = props["metadata"].clone();
        merge(
            &mut metadata,
            &json!({ "name": name, "namespace": "default", "uid": random_hex(32) }),
        );

        let object = match request.kind {
            ResourceKind::ConfigMap => json!({
                "kind": "ConfigMap",
                "metadata": metadata,
                "data": props["data"],
            }),
            ResourceKind::Deployment => {
                let volumes = props["spec"]["template"]["spec"]["volumes"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default();
                for volume in &volumes {
                    if let Some(config_map) = volume["configMap"]["name"].as_str() {
                        if !self.config_map_exists(config_map) {
                            bail!("configmaps \"{}\" not found", config_map);
                        }
                    }
                }
                let replicas = props["spec"]["replicas"].as_u64().unwrap_or(1);
                json!({
                    "kind": "Deployment",
                    "metadata": metadata,
                    "spec": props["spec"],
                    "status": { "replicas": replicas, "readyReplicas": replicas },
                })
            }
            ResourceKind::Service => {
                let mut spec = props["spec"].clone();
                merge(&mut spec, &json!({ "clusterIP": "10.0.24.117" }));
                json!({
                    "kind": "Service",
                    "metadata": metadata,
                    "spec": spec,
                    "status": { "loadBalancer": {} },
                })
            }
            other => bail!("cluster provider cannot create {}", other),
        };
        Ok(object)
    }

    fn live_status(&self, node: &str, object: &Value) -> Value {
        let mut object = object.clone();
        if object["kind"] == "Service" && object["spec"]["type"] == "LoadBalancer" {
            let mut polls = self.polls.lock();
            let count = polls.entry(node.to_string()).or_insert(0);
            *count += 1;
            if *count > self.pending_polls {
                let ingress = match &self.ingress {
                    Ingress::Ip(ip) => json!({ "ip": ip }),
                    Ingress::Hostname(host) => json!({ "hostname": host }),
                };
                object["status"]["loadBalancer"] = json!({ "ingress": [ingress] });
            }
        }
        object
    }
}

impl Default for MockClusterProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceProvider for MockClusterProvider {
    fn name(&self) -> &str {
        "mock-kubernetes"
    }

    fn handles(&self, kind: ResourceKind) -> bool {
        kind.is_cluster_workload()
    }

    async fn create(&self, request: CreateRequest) -> Result<Value> {
        self.record("create", request.node.as_str());
        self.script.before(request.node.as_str()).await?;

        let object = self.realize(&request)?;
        self.objects
            .lock()
            .insert(request.node.to_string(), object.clone());
        Ok(object)
    }

    async fn read(&self, resource: ResourceRef) -> Result<Value> {
        self.record("read", resource.node.as_str());
        let object = self
            .objects
            .lock()
            .get(resource.node.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("'{}' does not exist", resource.node))?;
        Ok(self.live_status(resource.node.as_str(), &object))
    }

    async fn delete(&self, resource: ResourceRef) -> Result<()> {
        self.record("delete", resource.node.as_str());
        match self.objects.lock().remove(resource.node.as_str()) {
            Some(_) => Ok(()),
            None => bail!("'{}' does not exist", resource.node),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// CONNECTOR
// ═══════════════════════════════════════════════════════════════

/// Connects every binding to one shared [`MockClusterProvider`]
pub struct MockConnector {
    cluster: Arc<MockClusterProvider>,
    failure: Option<String>,
    connections: Mutex<Vec<ProviderBinding>>,
}

impl MockConnector {
    pub fn new(cluster: MockClusterProvider) -> Self {
        Self {
            cluster: Arc::new(cluster),
            failure: None,
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Refuse every connection
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    pub fn cluster(&self) -> Arc<MockClusterProvider> {
        Arc::clone(&self.cluster)
    }

    /// Bindings connected so far, in order
    pub fn connections(&self) -> Vec<ProviderBinding> {
        self.connections.lock().clone()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new(MockClusterProvider::new())
    }
}

#[async_trait]
impl ClusterConnector for MockConnector {
    async fn connect(&self, binding: &ProviderBinding) -> Result<Arc<dyn ResourceProvider>> {
        self.connections.lock().push(binding.clone());
        if let Some(reason) = &self.failure {
            bail!("cannot reach {}: {}", binding.descriptor().endpoint, reason);
        }
        Ok(Arc::clone(&self.cluster) as Arc<dyn ResourceProvider>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::decode_kubeconfig;
    use crate::output::NodeId;

    fn create(node: &str, kind: ResourceKind, properties: Value) -> CreateRequest {
        CreateRequest {
            node: NodeId::new(node),
            kind,
            properties,
        }
    }

    fn reference(node: &str, kind: ResourceKind) -> ResourceRef {
        ResourceRef {
            node: NodeId::new(node),
            kind,
            outputs: Value::Null,
        }
    }

    #[tokio::test]
    async fn cloud_auto_names_with_suffix() {
        let cloud = MockCloudProvider::new().with_fixed_suffix("abc123");
        let out = cloud
            .create(create("resource_group", ResourceKind::ResourceGroup, json!({})))
            .await
            .unwrap();
        assert_eq!(out["name"], "resource_groupabc123");
        assert_eq!(out["location"], "westus2");
        assert!(cloud.created("resource_group").is_some());
    }

    #[tokio::test]
    async fn random_suffix_has_fixed_length() {
        let cloud = MockCloudProvider::new();
        let out = cloud
            .create(create("rg", ResourceKind::ResourceGroup, json!({})))
            .await
            .unwrap();
        assert_eq!(out["name"].as_str().unwrap().len(), "rg".len() + NAME_SUFFIX_LEN);
    }

    #[tokio::test]
    async fn cloud_overrides_are_merged() {
        let cloud = MockCloudProvider::new().with_outputs("rg", json!({ "name": "rg1" }));
        let out = cloud
            .create(create("rg", ResourceKind::ResourceGroup, json!({})))
            .await
            .unwrap();
        assert_eq!(out["name"], "rg1");
        assert!(out["id"].as_str().unwrap().starts_with("/subscriptions/"));
    }

    #[tokio::test]
    async fn cloud_failure_is_reported_and_recorded() {
        let cloud = MockCloudProvider::new().with_failure("rg", "quota exceeded");
        let err = cloud
            .create(create("rg", ResourceKind::ResourceGroup, json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(cloud.call_count("create"), 1);
        assert!(cloud.created("rg").is_none());
    }

    #[tokio::test]
    async fn cloud_refuses_workloads() {
        let cloud = MockCloudProvider::new();
        assert!(!cloud.handles(ResourceKind::Service));
        assert!(cloud
            .create(create("svc", ResourceKind::Service, json!({})))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn generated_credentials_decode_to_cluster_endpoint() {
        let cloud = MockCloudProvider::new().with_fixed_suffix("x1");
        let out = cloud
            .create(create(
                "managed_cluster",
                ResourceKind::ManagedCluster,
                json!({ "resourceGroupName": "rg1", "dnsPrefix": "dnsprefix", "location": "westus" }),
            ))
            .await
            .unwrap();

        let results = cloud
            .list_cluster_user_credentials("creds", "rg1", "managed_clusterx1")
            .await
            .unwrap();
        let descriptor = decode_kubeconfig("creds", &results).unwrap();
        let fqdn = out["fqdn"].as_str().unwrap();
        assert_eq!(descriptor.endpoint.host_str(), Some(fqdn));
        assert!(fqdn.starts_with("dnsprefix-"));
    }

    #[tokio::test]
    async fn credentials_for_unknown_cluster_fail() {
        let cloud = MockCloudProvider::new();
        let err = cloud
            .list_cluster_user_credentials("creds", "rg1", "missing")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn delete_removes_resource() {
        let cloud = MockCloudProvider::new();
        cloud
            .create(create("rg", ResourceKind::ResourceGroup, json!({})))
            .await
            .unwrap();
        cloud.delete(reference("rg", ResourceKind::ResourceGroup)).await.unwrap();
        assert!(cloud.created("rg").is_none());
        assert!(cloud.delete(reference("rg", ResourceKind::ResourceGroup)).await.is_err());
    }

    #[tokio::test]
    async fn load_balancer_reports_ingress_after_pending_polls() {
        let cluster = MockClusterProvider::new().with_pending_polls(2);
        cluster
            .create(create(
                "nginx-lb",
                ResourceKind::Service,
                json!({ "metadata": {}, "spec": { "type": "LoadBalancer" } }),
            ))
            .await
            .unwrap();

        for _ in 0..2 {
            let status = cluster.read(reference("nginx-lb", ResourceKind::Service)).await.unwrap();
            assert!(status["status"]["loadBalancer"]["ingress"].is_null());
        }
        let status = cluster.read(reference("nginx-lb", ResourceKind::Service)).await.unwrap();
        assert_eq!(status["status"]["loadBalancer"]["ingress"][0]["ip"], "20.81.10.7");
        assert_eq!(cluster.polls("nginx-lb"), 3);
    }

    #[tokio::test]
    async fn deployment_requires_existing_config_map() {
        let cluster = MockClusterProvider::new().with_fixed_suffix("k2");
        let deployment = json!({
            "metadata": {},
            "spec": { "replicas": 1, "template": { "spec": {
                "volumes": [{ "name": "nginx-html", "configMap": { "name": "nginx-html-k2" } }]
            } } }
        });

        let err = cluster
            .create(create("nginx", ResourceKind::Deployment, deployment.clone()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nginx-html-k2"));

        let cm = cluster
            .create(create(
                "nginx-html",
                ResourceKind::ConfigMap,
                json!({ "metadata": {}, "data": { "index.html": "<h1/>" } }),
            ))
            .await
            .unwrap();
        assert_eq!(cm["metadata"]["name"], "nginx-html-k2");
        assert!(cluster
            .create(create("nginx", ResourceKind::Deployment, deployment))
            .await
            .is_ok());
    }

    #[test]
    fn merge_is_recursive() {
        let mut base = json!({ "a": { "b": 1, "c": 2 }, "d": [1] });
        merge(&mut base, &json!({ "a": { "c": 3 }, "d": [2, 3] }));
        assert_eq!(base, json!({ "a": { "b": 1, "c": 3 }, "d": [2, 3] }));
    }
}
