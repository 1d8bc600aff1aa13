//! Credential decode chain
//!
//! A cluster credential lookup returns base64 bundles. The first bundle is
//! decoded into a [`ConnectionDescriptor`] (endpoint + auth material) which
//! configures a provider binding:
//!
//! ```text
//! CredentialResults ─select─► CredentialBundle ─base64─► UTF-8 ─parse─► ConnectionDescriptor
//! ```
//!
//! Every step failure is a credential error (`MissingCredential` or
//! `CredentialDecode`), never a provider error.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SkyError};

/// One named credential blob (base64 text)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub name: String,
    pub value: String,
}

impl CredentialBundle {
    /// Bundle carrying `document` base64-encoded
    pub fn encode(name: impl Into<String>, document: &str) -> Self {
        Self {
            name: name.into(),
            value: STANDARD.encode(document.as_bytes()),
        }
    }
}

/// Result of a cluster user credential lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialResults {
    pub kubeconfigs: Vec<CredentialBundle>,
}

/// Authentication material for a target
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Token(String),
    ClientCertificate { certificate: String, key: String },
}

impl Auth {
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Token(_) => "token",
            Self::ClientCertificate { .. } => "client-certificate",
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Auth::{}(<redacted>)", self.scheme())
    }
}

/// Decoded endpoint and auth material for a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub endpoint: Url,
    pub auth: Auth,
    pub certificate_authority: Option<String>,
    pub namespace: Option<String>,
    /// The exact decoded document, kept for lossless re-encoding
    source: Arc<str>,
}

// Flat descriptor document: {endpoint, token, ...}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatDocument {
    endpoint: String,
    token: Option<String>,
    client_certificate: Option<String>,
    client_key: Option<String>,
    certificate_authority: Option<String>,
    namespace: Option<String>,
}

// Kubeconfig document (only the fields a connection needs)
#[derive(Deserialize)]
struct Kubeconfig {
    #[serde(rename = "current-context")]
    current_context: Option<String>,
    #[serde(default)]
    clusters: Vec<Named<KubeCluster>>,
    #[serde(default)]
    users: Vec<Named<KubeUser>>,
    #[serde(default)]
    contexts: Vec<Named<KubeContext>>,
}

#[derive(Deserialize)]
struct Named<T> {
    name: String,
    #[serde(alias = "cluster", alias = "user", alias = "context")]
    item: T,
}

#[derive(Deserialize)]
struct KubeCluster {
    server: String,
    #[serde(rename = "certificate-authority-data")]
    certificate_authority_data: Option<String>,
}

#[derive(Deserialize)]
struct KubeUser {
    token: Option<String>,
    #[serde(rename = "client-certificate-data")]
    client_certificate_data: Option<String>,
    #[serde(rename = "client-key-data")]
    client_key_data: Option<String>,
}

#[derive(Deserialize)]
struct KubeContext {
    cluster: String,
    user: String,
    namespace: Option<String>,
}

impl ConnectionDescriptor {
    /// Parse a descriptor document (flat JSON/YAML or kubeconfig)
    pub fn parse(node: &str, document: &str) -> Result<Self> {
        let decode_err = |reason: String| SkyError::CredentialDecode {
            node: node.to_string(),
            reason,
        };

        // YAML is a superset of JSON, so one parser covers both shapes
        let value: serde_yaml::Value = serde_yaml::from_str(document)
            .map_err(|e| decode_err(format!("malformed descriptor document: {}", e)))?;
        if !value.is_mapping() {
            return Err(decode_err("descriptor document must be a mapping".into()));
        }

        let parts = if value.get("clusters").is_some() {
            let config: Kubeconfig = serde_yaml::from_value(value)
                .map_err(|e| decode_err(format!("malformed kubeconfig: {}", e)))?;
            from_kubeconfig(config).map_err(decode_err)?
        } else {
            let flat: FlatDocument = serde_yaml::from_value(value)
                .map_err(|e| decode_err(format!("malformed descriptor: {}", e)))?;
            from_flat(flat).map_err(decode_err)?
        };

        let endpoint = Url::parse(&parts.endpoint)
            .map_err(|e| decode_err(format!("endpoint '{}' is not a URL: {}", parts.endpoint, e)))?;
        if endpoint.host_str().is_none() {
            return Err(decode_err(format!("endpoint '{}' has no host", endpoint)));
        }

        Ok(Self {
            endpoint,
            auth: parts.auth,
            certificate_authority: parts.certificate_authority,
            namespace: parts.namespace,
            source: Arc::from(document),
        })
    }

    /// Base64 of the document this descriptor was decoded from
    pub fn encode(&self) -> String {
        STANDARD.encode(self.source.as_bytes())
    }

    pub fn document(&self) -> &str {
        &self.source
    }
}

struct DescriptorParts {
    endpoint: String,
    auth: Auth,
    certificate_authority: Option<String>,
    namespace: Option<String>,
}

fn from_flat(flat: FlatDocument) -> std::result::Result<DescriptorParts, String> {
    let auth = auth_from(flat.token, flat.client_certificate, flat.client_key)?;
    Ok(DescriptorParts {
        endpoint: flat.endpoint,
        auth,
        certificate_authority: flat.certificate_authority,
        namespace: flat.namespace,
    })
}

fn from_kubeconfig(config: Kubeconfig) -> std::result::Result<DescriptorParts, String> {
    let context = match &config.current_context {
        Some(name) => config
            .contexts
            .iter()
            .find(|c| &c.name == name)
            .ok_or_else(|| format!("current-context '{}' is not defined", name))?,
        None => config
            .contexts
            .first()
            .ok_or_else(|| "kubeconfig defines no contexts".to_string())?,
    };

    let cluster = config
        .clusters
        .into_iter()
        .find(|c| c.name == context.item.cluster)
        .ok_or_else(|| format!("cluster '{}' is not defined", context.item.cluster))?;
    let user = config
        .users
        .into_iter()
        .find(|u| u.name == context.item.user)
        .ok_or_else(|| format!("user '{}' is not defined", context.item.user))?;

    let auth = auth_from(
        user.item.token,
        user.item.client_certificate_data,
        user.item.client_key_data,
    )?;
    Ok(DescriptorParts {
        endpoint: cluster.item.server,
        auth,
        certificate_authority: cluster.item.certificate_authority_data,
        namespace: context.item.namespace.clone(),
    })
}

fn auth_from(
    token: Option<String>,
    certificate: Option<String>,
    key: Option<String>,
) -> std::result::Result<Auth, String> {
    match (token, certificate, key) {
        (Some(token), _, _) if !token.is_empty() => Ok(Auth::Token(token)),
        (_, Some(certificate), Some(key)) => Ok(Auth::ClientCertificate { certificate, key }),
        (_, Some(_), None) => Err("client certificate given without a client key".into()),
        _ => Err("descriptor carries no auth material (token or client certificate)".into()),
    }
}

/// First bundle of a lookup result
pub fn select_credential<'a>(node: &str, results: &'a CredentialResults) -> Result<&'a CredentialBundle> {
    results
        .kubeconfigs
        .first()
        .ok_or_else(|| SkyError::MissingCredential {
            node: node.to_string(),
        })
}

/// Base64-decode a bundle and interpret it as UTF-8 text
pub fn decode_bundle(node: &str, bundle: &CredentialBundle) -> Result<String> {
    let bytes = STANDARD
        .decode(bundle.value.trim())
        .map_err(|e| SkyError::CredentialDecode {
            node: node.to_string(),
            reason: format!("bundle '{}' is not valid base64: {}", bundle.name, e),
        })?;
    String::from_utf8(bytes).map_err(|e| SkyError::CredentialDecode {
        node: node.to_string(),
        reason: format!("bundle '{}' is not valid UTF-8: {}", bundle.name, e),
    })
}

/// Full chain: select the first bundle, decode it, parse the descriptor
pub fn decode_kubeconfig(node: &str, results: &CredentialResults) -> Result<ConnectionDescriptor> {
    let bundle = select_credential(node, results)?;
    let document = decode_bundle(node, bundle)?;
    ConnectionDescriptor::parse(node, &document)
}
