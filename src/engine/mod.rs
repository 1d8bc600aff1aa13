//! Engine Module - materialization and teardown of a declared graph
//!
//! - `materialize`: one spawned task per entry, data-flow driven
//! - `state`: per-entry outcomes (DashMap)
//! - `teardown`: reverse-dependency deletion
//!
//! There are no waves or barriers: an entry starts as soon as every entry it
//! depends on has completed, so entries without an edge run concurrently and
//! in any order. A failure marks every transitive dependent `Skipped` while
//! independent branches finish.

mod materialize;
mod state;
mod teardown;

use std::sync::Arc;

use serde_json::Value;

use crate::error::Failure;
use crate::event_log::EventLog;
use crate::graph::NodeSummary;
use crate::output::{NodeId, Resolution};
use crate::provider::{CloudProvider, ClusterConnector, ResourceProvider};

pub use crate::config::PollPolicy;
pub use state::{DeploymentState, NodeRecord, NodeStatus};

/// Drives providers to realize a graph
#[derive(Clone)]
pub struct Engine {
    cloud: Arc<dyn CloudProvider>,
    connector: Arc<dyn ClusterConnector>,
    ambient: Option<Arc<dyn ResourceProvider>>,
    poll: PollPolicy,
}

impl Engine {
    pub fn new(cloud: Arc<dyn CloudProvider>, connector: Arc<dyn ClusterConnector>) -> Self {
        Self {
            cloud,
            connector,
            ambient: None,
            poll: PollPolicy::default(),
        }
    }

    /// Provider for cluster workloads declared without a binding
    pub fn with_ambient_cluster(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.ambient = Some(provider);
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }
}

/// One export's outcome
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub name: Arc<str>,
    pub value: Resolution<Value>,
}

/// Result of materializing a graph
pub struct Deployment {
    name: String,
    order: Vec<NodeId>,
    summaries: Vec<NodeSummary>,
    state: DeploymentState,
    exports: Vec<ExportOutcome>,
    events: EventLog,
}

impl Deployment {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry ids in dependency order
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn summaries(&self) -> &[NodeSummary] {
        &self.summaries
    }

    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    pub fn record(&self, id: &str) -> Option<NodeRecord> {
        self.state.get(id)
    }

    pub fn is_created(&self, id: &str) -> bool {
        self.state.is_created(id)
    }

    pub fn exports(&self) -> &[ExportOutcome] {
        &self.exports
    }

    pub fn export(&self, name: &str) -> Option<&Resolution<Value>> {
        self.exports
            .iter()
            .find(|e| &*e.name == name)
            .map(|e| &e.value)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Entries whose own operation failed, in dependency order
    pub fn failures(&self) -> Vec<(NodeId, Failure)> {
        self.order
            .iter()
            .filter_map(|id| {
                let record = self.state.get(id.as_str())?;
                match record.status {
                    NodeStatus::Failed(cause) => Some((id.clone(), cause)),
                    _ => None,
                }
            })
            .collect()
    }

    /// The root cause to report: the first failed entry, else the first failed export
    pub fn first_failure(&self) -> Option<Failure> {
        self.failures()
            .into_iter()
            .map(|(_, cause)| cause)
            .next()
            .or_else(|| {
                self.exports
                    .iter()
                    .find_map(|e| e.value.as_ref().err().cloned())
            })
    }

    pub fn is_success(&self) -> bool {
        self.first_failure().is_none()
    }
}

impl std::fmt::Debug for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("exports", &self.exports.len())
            .field("events", &self.events)
            .finish()
    }
}
