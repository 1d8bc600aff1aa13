//! Event Sourcing for deployments
//!
//! Provides a full audit trail of one materialization or teardown.
//! - Event: envelope with id + timestamp + kind
//! - EventKind: deployment, node, lookup/binding and export levels
//! - EventLog: thread-safe, append-only log

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the deployment log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since deployment start (ms)
    pub timestamp_ms: u64,
    /// Event type and data
    pub kind: EventKind,
}

/// All possible event types
///
/// Uses Arc<str> for node fields so cloning an event never copies names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // DEPLOYMENT LEVEL
    // ═══════════════════════════════════════════
    DeploymentStarted {
        graph: String,
        node_count: usize,
    },
    DeploymentCompleted {
        created: usize,
        failed: usize,
        skipped: usize,
        total_duration_ms: u64,
    },

    // ═══════════════════════════════════════════
    // NODE LEVEL
    // ═══════════════════════════════════════════
    NodeScheduled {
        node: Arc<str>,
        kind: String,
        dependencies: Vec<Arc<str>>,
    },
    /// Every input resolved; the provider call is about to be issued
    NodeCreating {
        node: Arc<str>,
        target: String,
    },
    NodeCreated {
        node: Arc<str>,
        outputs: Value,
        duration_ms: u64,
    },
    NodeFailed {
        node: Arc<str>,
        error: String,
        duration_ms: u64,
    },
    /// An upstream failure prevented the provider call
    NodeSkipped {
        node: Arc<str>,
        cause: String,
    },
    NodeDeleted {
        node: Arc<str>,
    },

    // ═══════════════════════════════════════════
    // LOOKUPS, BINDINGS AND STATUS
    // ═══════════════════════════════════════════
    LookupResolved {
        node: Arc<str>,
        operation: String,
    },
    BindingResolved {
        node: Arc<str>,
        endpoint: String,
    },
    StatusPolled {
        node: Arc<str>,
        attempt: u32,
        ready: bool,
    },

    // ═══════════════════════════════════════════
    // EXPORTS
    // ═══════════════════════════════════════════
    ExportResolved {
        name: Arc<str>,
        value: Value,
    },
    ExportFailed {
        name: Arc<str>,
        error: String,
    },
}

impl EventKind {
    /// Extract the graph entry the event is about, if any
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::NodeScheduled { node, .. }
            | Self::NodeCreating { node, .. }
            | Self::NodeCreated { node, .. }
            | Self::NodeFailed { node, .. }
            | Self::NodeSkipped { node, .. }
            | Self::NodeDeleted { node }
            | Self::LookupResolved { node, .. }
            | Self::BindingResolved { node, .. }
            | Self::StatusPolled { node, .. } => Some(node),
            Self::DeploymentStarted { .. }
            | Self::DeploymentCompleted { .. }
            | Self::ExportResolved { .. }
            | Self::ExportFailed { .. } => None,
        }
    }

}

/// Thread-safe, append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    /// Create a new event log (call at deployment start)
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event (thread-safe, returns event ID)
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        };

        // Id allocation and push are not atomic together; keep the log sorted
        let mut events = self.events.write();
        let position = events.partition_point(|e| e.id < id);
        events.insert(position, event);
        id
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Zero-copy access to events via callback
    ///
    /// Holds the read lock for the duration of the callback.
    pub fn with_events<T>(&self, f: impl FnOnce(&[Event]) -> T) -> T {
        f(&self.events.read())
    }

    /// Events about one graph entry, in emission order
    pub fn filter_node(&self, node: &str) -> Vec<Event> {
        self.with_events(|events| {
            events
                .iter()
                .filter(|e| e.kind.node() == Some(node))
                .cloned()
                .collect()
        })
    }

    /// Id of the first event about `node` matching `pred`
    pub fn position(&self, node: &str, pred: impl Fn(&EventKind) -> bool) -> Option<u64> {
        self.with_events(|events| {
            events
                .iter()
                .find(|e| e.kind.node() == Some(node) && pred(&e.kind))
                .map(|e| e.id)
        })
    }

    /// Serialize to JSON for persistence/debugging
    pub fn to_json(&self) -> Value {
        self.with_events(|events| serde_json::to_value(events).unwrap_or(Value::Null))
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn created(node: &str) -> EventKind {
        EventKind::NodeCreated {
            node: node.into(),
            outputs: json!({ "name": format!("{node}-1a2b3c4d") }),
            duration_ms: 5,
        }
    }

    #[test]
    fn eventkind_node_extraction() {
        assert_eq!(created("resource_group").node(), Some("resource_group"));
        let started = EventKind::DeploymentStarted {
            graph: "nginx".into(),
            node_count: 3,
        };
        assert_eq!(started.node(), None);
    }

    #[test]
    fn emit_assigns_monotonic_ids() {
        let log = EventLog::new();
        assert!(log.is_empty());
        let first = log.emit(created("a"));
        let second = log.emit(created("b"));
        assert!(second > first);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn filter_node_and_position() {
        let log = EventLog::new();
        log.emit(EventKind::NodeScheduled {
            node: "nginx".into(),
            kind: "deployment".into(),
            dependencies: vec!["nginx-html".into()],
        });
        log.emit(created("nginx-html"));
        log.emit(created("nginx"));

        assert_eq!(log.filter_node("nginx").len(), 2);
        let html = log.position("nginx-html", |k| matches!(k, EventKind::NodeCreated { .. }));
        let nginx = log.position("nginx", |k| matches!(k, EventKind::NodeCreated { .. }));
        assert!(html.unwrap() < nginx.unwrap());
        assert!(log.position("missing", |_| true).is_none());
    }

    #[test]
    fn to_json_uses_snake_case_tags() {
        let log = EventLog::new();
        log.emit(EventKind::ExportResolved {
            name: "frontend_IP".into(),
            value: json!("20.1.2.3"),
        });
        let dumped = log.to_json();
        assert_eq!(dumped[0]["kind"]["type"], "export_resolved");
        assert_eq!(dumped[0]["kind"]["value"], "20.1.2.3");
    }

    #[test]
    fn dumped_events_read_back() {
        let log = EventLog::new();
        log.emit(EventKind::NodeScheduled {
            node: "managed_cluster".into(),
            kind: "resource:managed-cluster".into(),
            dependencies: vec!["resource_group".into(), "client_config".into()],
        });
        let events: Vec<Event> = serde_json::from_value(log.to_json()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            EventKind::NodeScheduled {
                node: "managed_cluster".into(),
                kind: "resource:managed-cluster".into(),
                dependencies: vec!["resource_group".into(), "client_config".into()],
            }
        );
    }

    #[test]
    fn concurrent_emit_is_thread_safe() {
        let log = EventLog::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        log.emit(created(&format!("node{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 200);
        let ids: Vec<u64> = log.events().iter().map(|e| e.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
