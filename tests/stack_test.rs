//! # Stack Tests
//!
//! The full nginx stack materialized against the mock providers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use skyform::engine::{Engine, PollPolicy};
use skyform::provider::{MockCloudProvider, MockClusterProvider, MockConnector};
use skyform::stack::{self, declare_nginx_stack, StackInputs, EXPORT_NAME};
use skyform::{EventKind, StackConfig};

fn inputs() -> StackInputs {
    StackInputs {
        ssh_public_key: "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQC test@example".to_string(),
        index_html: "<html><body><h1>Hello from skyform</h1></body></html>".to_string(),
    }
}

fn engine(cloud: Arc<MockCloudProvider>, connector: Arc<MockConnector>) -> Engine {
    Engine::new(cloud, connector).with_poll_policy(PollPolicy::new(
        Duration::from_millis(5),
        Duration::from_millis(500),
    ))
}

#[tokio::test]
async fn test_stack_exports_frontend_ip() {
    let cloud = Arc::new(MockCloudProvider::new().with_fixed_suffix("a1b2c3d4"));
    let connector = Arc::new(MockConnector::new(
        MockClusterProvider::new().with_fixed_suffix("e5f6"),
    ));
    let graph = declare_nginx_stack(&inputs()).unwrap();

    let deployment = engine(cloud.clone(), connector.clone())
        .materialize(graph)
        .await
        .unwrap();

    assert!(deployment.is_success(), "{:?}", deployment.first_failure());
    assert_eq!(
        deployment.export(EXPORT_NAME).unwrap().as_ref().unwrap(),
        &json!("20.81.10.7")
    );

    // The binding connected to the cluster the lookup described
    let connections = connector.connections();
    assert_eq!(connections.len(), 1);
    let host = connections[0].descriptor().endpoint.host_str().unwrap().to_string();
    assert!(host.starts_with("dnsprefix-"), "{}", host);
    assert!(host.ends_with(".hcp.westus2.azmk8s.io"), "{}", host);
}

#[tokio::test]
async fn test_outputs_are_wired_by_physical_name() {
    let cloud = Arc::new(MockCloudProvider::new().with_fixed_suffix("a1b2c3d4"));
    let connector = Arc::new(MockConnector::new(
        MockClusterProvider::new().with_fixed_suffix("e5f6"),
    ));
    let graph = declare_nginx_stack(&inputs()).unwrap();
    engine(cloud.clone(), connector.clone())
        .materialize(graph)
        .await
        .unwrap();

    let identity = cloud.created("userAssignedIdentity").unwrap();
    assert_eq!(identity["resourceGroupName"], "resource_groupa1b2c3d4");

    let cluster = cloud.created("managed_cluster").unwrap();
    assert_eq!(cluster["location"], "westus2");
    let expected_identity = "/subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/\
        resource_groupa1b2c3d4/providers/Microsoft.ManagedIdentity/userAssignedIdentities/\
        userAssignedIdentitya1b2c3d4";
    assert_eq!(
        cluster["identity"]["userAssignedIdentities"],
        json!({ expected_identity: {} })
    );

    let cluster_provider = connector.cluster();
    let config_map = cluster_provider.created("nginx-html").unwrap();
    assert_eq!(config_map["metadata"]["name"], "nginx-html-e5f6");
    assert_eq!(config_map["data"]["index.html"], json!(inputs().index_html));

    let deployment = cluster_provider.created("nginx").unwrap();
    let pod = &deployment["spec"]["template"]["spec"];
    assert_eq!(pod["volumes"][0]["configMap"]["name"], "nginx-html-e5f6");
    assert_eq!(pod["containers"][0]["image"], stack::NGINX_IMAGE);
    assert_eq!(pod["containers"][0]["volumeMounts"][0]["subPath"], "index.html");

    let service = cluster_provider.created("nginx-lb").unwrap();
    assert_eq!(service["spec"]["type"], "LoadBalancer");
    assert_eq!(service["spec"]["ports"][0]["port"], 80);
}

#[tokio::test]
async fn test_workloads_wait_for_the_binding() {
    let cloud = Arc::new(MockCloudProvider::new().with_delay("managed_cluster", Duration::from_millis(30)));
    let connector = Arc::new(MockConnector::default());
    let graph = declare_nginx_stack(&inputs()).unwrap();
    let deployment = engine(cloud, connector).materialize(graph).await.unwrap();

    let events = deployment.events();
    let bound = events
        .position("inflation_provider", |k| matches!(k, EventKind::BindingResolved { .. }))
        .unwrap();
    for workload in ["nginx-html", "nginx", "nginx-lb"] {
        let creating = events
            .position(workload, |k| matches!(k, EventKind::NodeCreating { .. }))
            .unwrap();
        assert!(bound < creating, "{} started before the binding", workload);
    }
}

#[tokio::test]
async fn test_credential_lookup_failure_names_the_lookup() {
    let cloud = Arc::new(MockCloudProvider::new().with_failure("cluster_credentials", "AuthorizationFailed"));
    let graph = declare_nginx_stack(&inputs()).unwrap();
    let deployment = engine(cloud, Arc::new(MockConnector::default()))
        .materialize(graph)
        .await
        .unwrap();

    let failure = deployment.first_failure().unwrap();
    assert_eq!(failure.code(), "SKY-030");
    assert_eq!(failure.node(), Some("cluster_credentials"));
    assert!(failure.to_string().contains("AuthorizationFailed"));
    assert!(deployment.is_created("managed_cluster"));
    assert!(!deployment.is_created("nginx-lb"));
    assert!(deployment.export(EXPORT_NAME).unwrap().is_err());
}

#[tokio::test]
async fn test_failed_account_lookup_skips_the_cluster() {
    let cloud = Arc::new(MockCloudProvider::new().with_failure("client_config", "token expired"));
    let connector = Arc::new(MockConnector::default());
    let graph = declare_nginx_stack(&inputs()).unwrap();
    let deployment = engine(cloud.clone(), connector.clone())
        .materialize(graph)
        .await
        .unwrap();

    let failure = deployment.first_failure().unwrap();
    assert_eq!(failure.code(), "SKY-030");
    assert_eq!(failure.node(), Some("client_config"));

    // The identity does not need the account context
    assert!(deployment.is_created("resource_group"));
    assert!(deployment.is_created("userAssignedIdentity"));
    for node in ["managed_cluster", "cluster_credentials", "nginx-lb"] {
        assert_eq!(
            deployment.record(node).unwrap().status.label(),
            "skipped",
            "{}",
            node
        );
    }
    assert_eq!(cloud.call_count("list_cluster_user_credentials"), 0);
    assert!(connector.connections().is_empty());
    assert!(deployment.export(EXPORT_NAME).unwrap().is_err());
}

#[tokio::test]
async fn test_identity_map_uses_the_account_subscription() {
    let cloud = Arc::new(
        MockCloudProvider::new()
            .with_fixed_suffix("0f0f")
            .with_subscription("11111111-2222-3333-4444-555555555555")
            .with_location("northeurope"),
    );
    let graph = declare_nginx_stack(&inputs()).unwrap();
    let deployment = engine(cloud.clone(), Arc::new(MockConnector::default()))
        .materialize(graph)
        .await
        .unwrap();
    assert!(deployment.is_success(), "{:?}", deployment.first_failure());

    let group = cloud.created("resource_group").unwrap();
    assert_eq!(group["location"], "northeurope");

    let cluster = cloud.created("managed_cluster").unwrap();
    assert_eq!(cluster["location"], "northeurope");
    let expected_identity = "/subscriptions/11111111-2222-3333-4444-555555555555/resourceGroups/\
        resource_group0f0f/providers/Microsoft.ManagedIdentity/userAssignedIdentities/\
        userAssignedIdentity0f0f";
    assert_eq!(
        cluster["identity"]["userAssignedIdentities"],
        json!({ expected_identity: {} })
    );
}

#[tokio::test]
async fn test_teardown_removes_the_whole_stack() {
    let cloud = Arc::new(MockCloudProvider::new());
    let connector = Arc::new(MockConnector::default());
    let engine = engine(cloud.clone(), connector.clone());
    let deployment = engine
        .materialize(declare_nginx_stack(&inputs()).unwrap())
        .await
        .unwrap();

    engine.destroy(&deployment).await.unwrap();
    for node in ["resource_group", "userAssignedIdentity", "managed_cluster"] {
        assert!(cloud.created(node).is_none(), "{} still exists", node);
    }
    for node in ["nginx-html", "nginx", "nginx-lb"] {
        assert!(connector.cluster().created(node).is_none(), "{} still exists", node);
    }
}

#[test]
fn test_inputs_come_from_config_and_html_file() {
    let dir = TempDir::new().unwrap();
    let html = dir.path().join("index.html");
    std::fs::write(&html, "<p>hi</p>").unwrap();

    let mut config = StackConfig::new();
    config.set("skyform:sshPublicKey", "ssh-ed25519 AAAAC3Nza");
    let inputs = StackInputs::from_config(&config, &html).unwrap();
    assert_eq!(inputs.index_html, "<p>hi</p>");
    assert_eq!(inputs.ssh_public_key, "ssh-ed25519 AAAAC3Nza");

    let err = StackInputs::from_config(&config, Path::new("/nonexistent/index.html")).unwrap_err();
    assert_eq!(err.code(), "SKY-002");
}
