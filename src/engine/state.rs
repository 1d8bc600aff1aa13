//! DeploymentState - per-entry outcome storage with DashMap
//!
//! Written concurrently by the entry tasks of one materialization, read by
//! the CLI, tests and teardown.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;

use crate::error::Failure;
use crate::graph::EntryKind;
use crate::provider::Route;

/// Outcome of one graph entry
#[derive(Debug, Clone)]
pub enum NodeStatus {
    Created,
    /// Its own operation (or the transform feeding it) failed
    Failed(Failure),
    /// An upstream entry failed; no provider call was issued
    Skipped(Failure),
    /// Created, then removed by teardown
    Deleted,
}

impl NodeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub entry: EntryKind,
    pub status: NodeStatus,
    /// Provider outputs (Arc for O(1) cloning of large documents)
    pub outputs: Arc<Value>,
    pub duration: Duration,
    /// Provider that realized the entry, used again for teardown
    pub(crate) route: Option<Route>,
}

impl NodeRecord {
    pub fn created(entry: EntryKind, outputs: Value, duration: Duration, route: Option<Route>) -> Self {
        Self {
            entry,
            status: NodeStatus::Created,
            outputs: Arc::new(outputs),
            duration,
            route,
        }
    }

    pub fn failed(entry: EntryKind, cause: Failure, duration: Duration) -> Self {
        Self {
            entry,
            status: NodeStatus::Failed(cause),
            outputs: Arc::new(Value::Null),
            duration,
            route: None,
        }
    }

    pub fn skipped(entry: EntryKind, cause: Failure) -> Self {
        Self {
            entry,
            status: NodeStatus::Skipped(cause),
            outputs: Arc::new(Value::Null),
            duration: Duration::ZERO,
            route: None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self.status, NodeStatus::Created)
    }

    pub fn error(&self) -> Option<&Failure> {
        match &self.status {
            NodeStatus::Failed(cause) | NodeStatus::Skipped(cause) => Some(cause),
            NodeStatus::Created | NodeStatus::Deleted => None,
        }
    }

    /// Name of the provider that realized the entry
    pub fn provider(&self) -> Option<&str> {
        self.route.as_ref().map(Route::name)
    }
}

/// Thread-safe storage for entry outcomes
#[derive(Clone, Default)]
pub struct DeploymentState {
    records: Arc<DashMap<Arc<str>, NodeRecord>>,
}

impl DeploymentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: Arc<str>, record: NodeRecord) {
        self.records.insert(id, record);
    }

    pub fn get(&self, id: &str) -> Option<NodeRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn is_created(&self, id: &str) -> bool {
        self.records.get(id).is_some_and(|r| r.is_created())
    }

    pub fn mark_deleted(&self, id: &str) {
        if let Some(mut record) = self.records.get_mut(id) {
            record.status = NodeStatus::Deleted;
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// (created, failed, skipped)
    pub fn counts(&self) -> (usize, usize, usize) {
        self.records
            .iter()
            .fold((0, 0, 0), |(c, f, s), r| match r.status {
                NodeStatus::Created | NodeStatus::Deleted => (c + 1, f, s),
                NodeStatus::Failed(_) => (c, f + 1, s),
                NodeStatus::Skipped(_) => (c, f, s + 1),
            })
    }
}

impl std::fmt::Debug for DeploymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentState")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkyError;
    use crate::resource::ResourceKind;
    use serde_json::json;

    const RG: EntryKind = EntryKind::Resource(ResourceKind::ResourceGroup);

    #[test]
    fn records_and_counts() {
        let state = DeploymentState::new();
        let cause: Failure = Arc::new(SkyError::provider("rg", "resource-group", "create", "denied"));

        state.insert(
            "a".into(),
            NodeRecord::created(RG, json!({"name": "a1"}), Duration::from_millis(3), None),
        );
        state.insert("b".into(), NodeRecord::failed(RG, cause.clone(), Duration::ZERO));
        state.insert("c".into(), NodeRecord::skipped(RG, cause.clone()));

        assert_eq!(state.counts(), (1, 1, 1));
        assert!(state.is_created("a"));
        assert!(!state.is_created("c"));
        assert!(Arc::ptr_eq(state.get("c").unwrap().error().unwrap(), &cause));
        assert_eq!(state.get("a").unwrap().outputs["name"], "a1");
    }

    #[test]
    fn mark_deleted_updates_status() {
        let state = DeploymentState::new();
        state.insert("a".into(), NodeRecord::created(RG, json!({}), Duration::ZERO, None));
        state.mark_deleted("a");
        assert_eq!(state.get("a").unwrap().status.label(), "deleted");
        assert!(!state.is_created("a"));
    }
}
