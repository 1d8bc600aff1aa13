// The #[error] attribute from thiserror uses struct fields via string interpolation,
// but Rust's unused_assignments lint doesn't recognize this.
#![allow(unused_assignments)]

//! Skyform Error Types with Error Codes
//!
//! Error code ranges:
//! - SKY-000-009: Configuration errors
//! - SKY-010-029: Declaration / graph errors
//! - SKY-030-039: Provider errors
//! - SKY-040-049: Credential errors
//! - SKY-050-059: Status / export errors
//! - SKY-090-099: IO / serialization errors

use std::sync::Arc;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkyError>;

/// A failure shared by every consumer of a deferred value.
///
/// One upstream failure fans out to all dependents, so the cause travels
/// behind an `Arc` instead of being cloned.
pub type Failure = Arc<SkyError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum SkyError {
    // ═══════════════════════════════════════════
    // CONFIGURATION ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[SKY-001] Missing required configuration value '{key}'")]
    ConfigurationMissing { key: String },

    #[error("[SKY-002] Config error: {reason}")]
    ConfigError { reason: String },

    // ═══════════════════════════════════════════
    // DECLARATION ERRORS (010-029)
    // ═══════════════════════════════════════════
    #[error("[SKY-010] Invalid node name '{name}': {reason}")]
    InvalidNodeName { name: String, reason: String },

    #[error("[SKY-011] Node '{name}' is declared more than once")]
    DuplicateNode { name: String },

    #[error("[SKY-012] Invalid arguments for '{node}': {reason}")]
    InvalidSpec { node: String, reason: String },

    #[error("[SKY-013] Node '{node}' depends on '{dependency}' which is not declared in this graph")]
    UnknownDependency { node: String, dependency: String },

    #[error("[SKY-014] Invalid output path '{path}'")]
    InvalidOutputPath { path: String },

    #[error("[SKY-015] Chained value comes from '{dependency}', which is not among its declared entries [{declared}]")]
    UndeclaredDependency { dependency: String, declared: String },

    #[error("[SKY-020] Cycle detected in graph: {cycle}")]
    CycleDetected { cycle: String },

    // ═══════════════════════════════════════════
    // PROVIDER ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[SKY-030] {operation} of '{node}' ({kind}) failed: {reason}")]
    ProviderOperation {
        node: String,
        kind: String,
        operation: String,
        reason: String,
    },

    #[error("[SKY-031] No provider handles '{kind}' for '{node}' on target '{target}'")]
    NoProvider {
        node: String,
        kind: String,
        target: String,
    },

    #[error("[SKY-032] Output '{field}' of '{node}' is not available")]
    OutputMissing { node: String, field: String },

    #[error("[SKY-033] Value for '{what}' was never resolved")]
    Unresolved { what: String },

    // ═══════════════════════════════════════════
    // CREDENTIAL ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[SKY-040] '{node}' returned no credential bundles")]
    MissingCredential { node: String },

    #[error("[SKY-041] Cannot decode credentials from '{node}': {reason}")]
    CredentialDecode { node: String, reason: String },

    // ═══════════════════════════════════════════
    // STATUS / EXPORT ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[SKY-050] '{field}' of '{node}' was not populated within {timeout_ms}ms")]
    Timeout {
        node: String,
        field: String,
        timeout_ms: u64,
    },

    // ═══════════════════════════════════════════
    // IO / SERIALIZATION ERRORS (090-099)
    // ═══════════════════════════════════════════
    #[error("[SKY-093] IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("[SKY-094] JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("[SKY-095] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl SkyError {
    /// Get the error code (e.g., "SKY-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing { .. } => "SKY-001",
            Self::ConfigError { .. } => "SKY-002",
            Self::InvalidNodeName { .. } => "SKY-010",
            Self::DuplicateNode { .. } => "SKY-011",
            Self::InvalidSpec { .. } => "SKY-012",
            Self::UnknownDependency { .. } => "SKY-013",
            Self::InvalidOutputPath { .. } => "SKY-014",
            Self::UndeclaredDependency { .. } => "SKY-015",
            Self::CycleDetected { .. } => "SKY-020",
            Self::ProviderOperation { .. } => "SKY-030",
            Self::NoProvider { .. } => "SKY-031",
            Self::OutputMissing { .. } => "SKY-032",
            Self::Unresolved { .. } => "SKY-033",
            Self::MissingCredential { .. } => "SKY-040",
            Self::CredentialDecode { .. } => "SKY-041",
            Self::Timeout { .. } => "SKY-050",
            Self::IoError(_) => "SKY-093",
            Self::JsonError(_) => "SKY-094",
            Self::YamlParse(_) => "SKY-095",
        }
    }

    /// Short name of the error kind, used in user-facing failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing { .. } => "ConfigurationMissingError",
            Self::ConfigError { .. } => "ConfigurationError",
            Self::InvalidNodeName { .. }
            | Self::DuplicateNode { .. }
            | Self::InvalidSpec { .. }
            | Self::UnknownDependency { .. }
            | Self::InvalidOutputPath { .. }
            | Self::UndeclaredDependency { .. }
            | Self::CycleDetected { .. } => "DeclarationError",
            Self::ProviderOperation { .. } | Self::NoProvider { .. } => "ProviderOperationError",
            Self::OutputMissing { .. } | Self::Unresolved { .. } => "OutputError",
            Self::MissingCredential { .. } => "MissingCredentialError",
            Self::CredentialDecode { .. } => "CredentialDecodeError",
            Self::Timeout { .. } => "TimeoutError",
            Self::IoError(_) | Self::JsonError(_) | Self::YamlParse(_) => "IoError",
        }
    }

    /// The node this error is attributed to, when there is one
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::InvalidSpec { node, .. }
            | Self::UnknownDependency { node, .. }
            | Self::ProviderOperation { node, .. }
            | Self::NoProvider { node, .. }
            | Self::OutputMissing { node, .. }
            | Self::MissingCredential { node }
            | Self::CredentialDecode { node, .. }
            | Self::Timeout { node, .. } => Some(node),
            Self::InvalidNodeName { name, .. } | Self::DuplicateNode { name } => Some(name),
            _ => None,
        }
    }

    /// Build a provider failure for `node`
    pub fn provider(
        node: impl Into<String>,
        kind: impl ToString,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ProviderOperation {
            node: node.into(),
            kind: kind.to_string(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Credential problems are data-shape errors, not infrastructure errors
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. } | Self::CredentialDecode { .. }
        )
    }
}

impl FixSuggestion for SkyError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            SkyError::ConfigurationMissing { .. } => {
                Some("Set the key under `config:` in the stack file or export SKYFORM_<KEY>")
            }
            SkyError::ConfigError { .. } => Some("Check the stack file syntax and engine settings"),
            SkyError::InvalidNodeName { .. } => {
                Some("Use a name starting with a letter, then letters, digits, '_' or '-'")
            }
            SkyError::DuplicateNode { .. } => Some("Give every node in the graph a unique name"),
            SkyError::InvalidSpec { .. } => Some("Fix the resource arguments before provisioning"),
            SkyError::UnknownDependency { .. } => {
                Some("Only depend on resources declared in the same graph")
            }
            SkyError::InvalidOutputPath { .. } => {
                Some("Use dotted field names with numeric indexes, e.g. loadBalancer.ingress[0].ip")
            }
            SkyError::UndeclaredDependency { .. } => {
                Some("Pass every entry the chained value may come from to `and_then`")
            }
            SkyError::CycleDetected { .. } => Some("Remove the circular dependency between nodes"),
            SkyError::ProviderOperation { .. } => {
                Some("Check provider credentials and the failing resource's arguments")
            }
            SkyError::NoProvider { .. } => {
                Some("Attach the resource to a provider binding that handles its kind")
            }
            SkyError::OutputMissing { .. } => {
                Some("Check the provider reports this output for the resource")
            }
            SkyError::Unresolved { .. } => Some("Materialize the graph with an engine"),
            SkyError::MissingCredential { .. } => {
                Some("Check the cluster finished provisioning and exposes user credentials")
            }
            SkyError::CredentialDecode { .. } => {
                Some("The credential must be base64 of a UTF-8 kubeconfig or endpoint document")
            }
            SkyError::Timeout { .. } => {
                Some("Increase status_timeout_ms or check the load balancer provisioning")
            }
            SkyError::IoError(_) => Some("Check file path and permissions"),
            SkyError::JsonError(_) => Some("Check the JSON document is well formed"),
            SkyError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
        }
    }
}
