//! Materialization: one task per graph entry
//!
//! Every entry gets a completion signal. A task first waits for the signals
//! of its direct dependencies; the first failed one skips the entry with the
//! same cause. Otherwise it resolves its inputs, performs its provider
//! operation, records the outcome, and only then completes its own signal
//! and its deferred value.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

use super::state::{DeploymentState, NodeRecord};
use super::{Deployment, Engine, ExportOutcome, PollPolicy};
use crate::binding::{ProviderBinding, Target};
use crate::error::{Failure, Result, SkyError};
use crate::event_log::{EventKind, EventLog};
use crate::graph::{BindingNode, EntryKind, Graph, LookupNode, LookupOp, WatchNode};
use crate::output::{Deferred, Dependencies, NodeId, Resolution, Resolver};
use crate::provider::{
    CloudProvider, ClusterConnector, CreateRequest, ResourceProvider, ResourceRef, Route,
};
use crate::resource::{ResourceKind, ResourceNode};
use crate::util::path;

/// Shared by every entry task of one materialization
#[derive(Clone)]
struct RunContext {
    events: EventLog,
    state: DeploymentState,
    cloud: Arc<dyn CloudProvider>,
    connector: Arc<dyn ClusterConnector>,
    poll: PollPolicy,
    done: Arc<FxHashMap<NodeId, Deferred<()>>>,
}

/// Where a node's provider comes from
enum RouteSource {
    Ready(Route),
    Binding(Deferred<Route>),
    Missing { target: String },
}

impl RouteSource {
    async fn resolve(self, node: &NodeId, kind: ResourceKind) -> Resolution<Route> {
        let route = match self {
            Self::Ready(route) => route,
            Self::Binding(route) => route.resolve().await?,
            Self::Missing { target } => {
                return Err(Arc::new(SkyError::NoProvider {
                    node: node.to_string(),
                    kind: kind.to_string(),
                    target,
                }))
            }
        };
        if route.handles(kind) {
            Ok(route)
        } else {
            Err(Arc::new(SkyError::NoProvider {
                node: node.to_string(),
                kind: kind.to_string(),
                target: route.name().to_string(),
            }))
        }
    }
}

impl RunContext {
    /// Wait for every direct dependency; the first failure is returned
    async fn upstream(&self, dependencies: &Dependencies) -> Resolution<()> {
        let signals = dependencies
            .iter()
            .filter_map(|dep| self.done.get(dep).cloned())
            .map(|signal| async move { signal.resolve().await });
        try_join_all(signals).await.map(|_| ())
    }

    fn created(&self, id: &NodeId, entry: EntryKind, outputs: Value, started: Instant, route: Option<Route>) {
        let duration = started.elapsed();
        info!(node = %id, entry = %entry, duration_ms = duration.as_millis() as u64, "created");
        self.events.emit(EventKind::NodeCreated {
            node: id.as_arc(),
            outputs: outputs.clone(),
            duration_ms: duration.as_millis() as u64,
        });
        self.state
            .insert(id.as_arc(), NodeRecord::created(entry, outputs, duration, route));
    }

    fn failed(&self, id: &NodeId, entry: EntryKind, cause: &Failure, started: Instant) {
        let duration = started.elapsed();
        warn!(node = %id, entry = %entry, error = %cause, "failed");
        self.events.emit(EventKind::NodeFailed {
            node: id.as_arc(),
            error: cause.to_string(),
            duration_ms: duration.as_millis() as u64,
        });
        self.state
            .insert(id.as_arc(), NodeRecord::failed(entry, Arc::clone(cause), duration));
    }

    fn skipped(&self, id: &NodeId, entry: EntryKind, cause: &Failure) {
        info!(node = %id, cause = %cause, "skipped after upstream failure");
        self.events.emit(EventKind::NodeSkipped {
            node: id.as_arc(),
            cause: cause.to_string(),
        });
        self.state
            .insert(id.as_arc(), NodeRecord::skipped(entry, Arc::clone(cause)));
    }
}

fn provider_failure(node: &NodeId, kind: impl ToString, operation: &str, error: anyhow::Error) -> Failure {
    Arc::new(SkyError::provider(
        node.as_str(),
        kind,
        operation,
        format!("{:#}", error),
    ))
}

fn take_signal(signals: &mut FxHashMap<NodeId, Resolver<()>>, id: &NodeId) -> Resolver<()> {
    signals
        .remove(id)
        .unwrap_or_else(|| Deferred::<()>::channel(id.as_str(), Dependencies::none()).0)
}

impl Engine {
    /// Realize every entry of `graph` and resolve its exports.
    ///
    /// Provider failures do not make this return `Err`; they are recorded
    /// per entry in the returned [`Deployment`]. `Err` means the graph itself
    /// could not be scheduled (e.g. a cycle).
    #[instrument(skip(self, graph), fields(graph = graph.name(), entries = graph.len()))]
    pub async fn materialize(&self, graph: Graph) -> Result<Deployment> {
        let order = graph.dependency_graph().topological_order()?;
        let parts = graph.into_parts();
        let started = Instant::now();

        let events = EventLog::new();
        let state = DeploymentState::new();
        info!("Starting deployment");
        events.emit(EventKind::DeploymentStarted {
            graph: parts.name.clone(),
            node_count: parts.summaries.len(),
        });

        let mut signals = FxHashMap::default();
        let mut done = FxHashMap::default();
        for summary in &parts.summaries {
            events.emit(EventKind::NodeScheduled {
                node: summary.id.as_arc(),
                kind: summary.entry.to_string(),
                dependencies: summary.dependencies.iter().map(NodeId::as_arc).collect(),
            });
            let (resolver, signal) =
                Deferred::channel(summary.id.as_str(), Dependencies::single(summary.id.clone()));
            signals.insert(summary.id.clone(), resolver);
            done.insert(summary.id.clone(), signal);
        }

        let ctx = RunContext {
            events: events.clone(),
            state: state.clone(),
            cloud: Arc::clone(&self.cloud),
            connector: Arc::clone(&self.connector),
            poll: self.poll,
            done: Arc::new(done),
        };

        let mut join_set = JoinSet::new();

        let mut routes: FxHashMap<NodeId, Deferred<Route>> = FxHashMap::default();
        for binding in parts.bindings {
            let (route_resolver, route) =
                Deferred::channel(binding.id.as_str(), Dependencies::single(binding.id.clone()));
            routes.insert(binding.id.clone(), route);
            let signal = take_signal(&mut signals, &binding.id);
            let span = info_span!("binding", node = %binding.id);
            join_set.spawn(run_binding(ctx.clone(), binding, route_resolver, signal).instrument(span));
        }

        for lookup in parts.lookups {
            let signal = take_signal(&mut signals, &lookup.id);
            let span = info_span!("lookup", node = %lookup.id);
            join_set.spawn(run_lookup(ctx.clone(), lookup, signal).instrument(span));
        }

        for node in parts.resources {
            let route = self.route_for(&node.target, node.kind(), &routes);
            let signal = take_signal(&mut signals, &node.id);
            let span = info_span!("resource", node = %node.id, kind = %node.kind());
            join_set.spawn(run_resource(ctx.clone(), node, route, signal).instrument(span));
        }

        for watch in parts.watches {
            let route = self.route_for(&watch.target, watch.kind, &routes);
            let signal = take_signal(&mut signals, &watch.id);
            let span = info_span!("watch", node = %watch.id);
            join_set.spawn(run_watch(ctx.clone(), watch, route, signal).instrument(span));
        }

        let mut exports = Vec::with_capacity(parts.exports.len());
        for export in parts.exports {
            let value = export.value.resolve().await;
            match &value {
                Ok(resolved) => {
                    info!(export = %export.name, value = %resolved, "export resolved");
                    events.emit(EventKind::ExportResolved {
                        name: Arc::clone(&export.name),
                        value: resolved.clone(),
                    });
                }
                Err(cause) => {
                    warn!(export = %export.name, error = %cause, "export failed");
                    events.emit(EventKind::ExportFailed {
                        name: Arc::clone(&export.name),
                        error: cause.to_string(),
                    });
                }
            }
            exports.push(ExportOutcome {
                name: export.name,
                value,
            });
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                // A panicked task dropped its resolvers; dependents saw `Unresolved`
                warn!(error = %e, "entry task aborted");
            }
        }

        let (created, failed, skipped) = state.counts();
        events.emit(EventKind::DeploymentCompleted {
            created,
            failed,
            skipped,
            total_duration_ms: started.elapsed().as_millis() as u64,
        });
        info!(created, failed, skipped, "Deployment finished");

        Ok(Deployment {
            name: parts.name,
            order,
            summaries: parts.summaries,
            state,
            exports,
            events,
        })
    }

    fn route_for(
        &self,
        target: &Target,
        kind: ResourceKind,
        routes: &FxHashMap<NodeId, Deferred<Route>>,
    ) -> RouteSource {
        match target {
            Target::Default if !kind.is_cluster_workload() => {
                RouteSource::Ready(Route::Cloud(Arc::clone(&self.cloud)))
            }
            Target::Default => match &self.ambient {
                Some(provider) => RouteSource::Ready(Route::Cluster(Arc::clone(provider))),
                None => RouteSource::Missing {
                    target: target.to_string(),
                },
            },
            Target::Bound(handle) => match routes.get(handle.id()) {
                Some(route) => RouteSource::Binding(route.clone()),
                None => RouteSource::Missing {
                    target: target.to_string(),
                },
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// ENTRY TASKS
// ═══════════════════════════════════════════════════════════════

async fn run_resource(ctx: RunContext, node: ResourceNode, route: RouteSource, signal: Resolver<()>) {
    let ResourceNode {
        id,
        spec,
        target: _,
        dependencies,
        resolver,
    } = node;
    let kind = spec.kind();
    let entry = EntryKind::Resource(kind);

    if let Err(cause) = ctx.upstream(&dependencies).await {
        ctx.skipped(&id, entry, &cause);
        resolver.fail(Arc::clone(&cause));
        signal.fail(cause);
        return;
    }

    let started = Instant::now();
    let prepared = async {
        let properties = spec.render().await?;
        let route = route.resolve(&id, kind).await?;
        Ok::<_, Failure>((properties, route))
    };
    let (properties, route) = match prepared.await {
        Ok(prepared) => prepared,
        Err(cause) => {
            ctx.failed(&id, entry, &cause, started);
            resolver.fail(Arc::clone(&cause));
            signal.fail(cause);
            return;
        }
    };

    info!(provider = route.name(), "creating");
    ctx.events.emit(EventKind::NodeCreating {
        node: id.as_arc(),
        target: route.name().to_string(),
    });

    let request = CreateRequest {
        node: id.clone(),
        kind,
        properties,
    };
    match route.create(request).await {
        Ok(outputs) => {
            ctx.created(&id, entry, outputs.clone(), started, Some(route));
            resolver.resolve(outputs);
            signal.resolve(());
        }
        Err(error) => {
            let cause = provider_failure(&id, kind, "create", error);
            ctx.failed(&id, entry, &cause, started);
            resolver.fail(Arc::clone(&cause));
            signal.fail(cause);
        }
    }
}

async fn run_lookup(ctx: RunContext, lookup: LookupNode, signal: Resolver<()>) {
    let LookupNode {
        id,
        op,
        dependencies,
    } = lookup;
    let operation = op.operation();
    let entry = EntryKind::Lookup(operation);

    let upstream = ctx.upstream(&dependencies).await;
    let started = Instant::now();

    match op {
        LookupOp::ClientConfig { resolver } => {
            if let Err(cause) = upstream {
                ctx.skipped(&id, entry, &cause);
                resolver.fail(Arc::clone(&cause));
                signal.fail(cause);
                return;
            }
            match ctx.cloud.client_config(id.as_str()).await {
                Ok(config) => {
                    let outputs = serde_json::to_value(&config).unwrap_or(Value::Null);
                    ctx.events.emit(EventKind::LookupResolved {
                        node: id.as_arc(),
                        operation: operation.to_string(),
                    });
                    ctx.created(&id, entry, outputs, started, None);
                    resolver.resolve(config);
                    signal.resolve(());
                }
                Err(error) => {
                    let cause = provider_failure(&id, entry, operation, error);
                    ctx.failed(&id, entry, &cause, started);
                    resolver.fail(Arc::clone(&cause));
                    signal.fail(cause);
                }
            }
        }
        LookupOp::ClusterUserCredentials {
            resource_group,
            cluster,
            resolver,
        } => {
            if let Err(cause) = upstream {
                ctx.skipped(&id, entry, &cause);
                resolver.fail(Arc::clone(&cause));
                signal.fail(cause);
                return;
            }
            let inputs = async {
                let rg = resource_group.resolve().await?;
                let cluster = cluster.resolve().await?;
                Ok::<_, Failure>((rg, cluster))
            };
            let (rg, cluster) = match inputs.await {
                Ok(inputs) => inputs,
                Err(cause) => {
                    ctx.failed(&id, entry, &cause, started);
                    resolver.fail(Arc::clone(&cause));
                    signal.fail(cause);
                    return;
                }
            };
            match ctx
                .cloud
                .list_cluster_user_credentials(id.as_str(), &rg, &cluster)
                .await
            {
                Ok(results) => {
                    ctx.events.emit(EventKind::LookupResolved {
                        node: id.as_arc(),
                        operation: operation.to_string(),
                    });
                    // Credentials stay out of the recorded outputs
                    let outputs = serde_json::json!({
                        "cluster": cluster,
                        "bundles": results.kubeconfigs.len(),
                    });
                    ctx.created(&id, entry, outputs, started, None);
                    resolver.resolve(results);
                    signal.resolve(());
                }
                Err(error) => {
                    let cause = provider_failure(&id, entry, operation, error);
                    ctx.failed(&id, entry, &cause, started);
                    resolver.fail(Arc::clone(&cause));
                    signal.fail(cause);
                }
            }
        }
    }
}

async fn run_binding(
    ctx: RunContext,
    binding: BindingNode,
    route_resolver: Resolver<Route>,
    signal: Resolver<()>,
) {
    let BindingNode {
        id,
        descriptor,
        dependencies,
        resolver,
    } = binding;
    let entry = EntryKind::Binding;

    if let Err(cause) = ctx.upstream(&dependencies).await {
        ctx.skipped(&id, entry, &cause);
        resolver.fail(Arc::clone(&cause));
        route_resolver.fail(Arc::clone(&cause));
        signal.fail(cause);
        return;
    }

    let started = Instant::now();
    let connected = async {
        let descriptor = descriptor.resolve().await?;
        let binding = Arc::new(ProviderBinding::new(id.clone(), descriptor));
        let provider: Arc<dyn ResourceProvider> = ctx
            .connector
            .connect(&binding)
            .await
            .map_err(|e| provider_failure(&id, entry, "connect", e))?;
        Ok::<_, Failure>((binding, provider))
    };

    match connected.await {
        Ok((binding, provider)) => {
            let endpoint = binding.descriptor().endpoint.to_string();
            ctx.events.emit(EventKind::BindingResolved {
                node: id.as_arc(),
                endpoint: endpoint.clone(),
            });
            let route = Route::Cluster(provider);
            ctx.created(
                &id,
                entry,
                serde_json::json!({ "endpoint": endpoint, "provider": route.name() }),
                started,
                None,
            );
            resolver.resolve(binding);
            route_resolver.resolve(route);
            signal.resolve(());
        }
        Err(cause) => {
            ctx.failed(&id, entry, &cause, started);
            resolver.fail(Arc::clone(&cause));
            route_resolver.fail(Arc::clone(&cause));
            signal.fail(cause);
        }
    }
}

async fn run_watch(ctx: RunContext, watch: WatchNode, route: RouteSource, signal: Resolver<()>) {
    let WatchNode {
        id,
        resource,
        kind,
        target: _,
        ready,
        dependencies,
        resolver,
    } = watch;
    let entry = EntryKind::Watch;

    if let Err(cause) = ctx.upstream(&dependencies).await {
        ctx.skipped(&id, entry, &cause);
        resolver.fail(Arc::clone(&cause));
        signal.fail(cause);
        return;
    }

    let started = Instant::now();
    let outcome = async {
        let route = route.resolve(&resource, kind).await?;
        let outputs = ctx
            .state
            .get(resource.as_str())
            .map(|r| (*r.outputs).clone())
            .unwrap_or(Value::Null);
        poll_until_ready(&ctx, &id, &resource, kind, &route, &outputs, &ready).await
    };

    match outcome.await {
        Ok(status) => {
            ctx.created(&id, entry, status.clone(), started, None);
            resolver.resolve(status);
            signal.resolve(());
        }
        Err(cause) => {
            ctx.failed(&id, entry, &cause, started);
            resolver.fail(Arc::clone(&cause));
            signal.fail(cause);
        }
    }
}

/// Read live status until `ready` is populated or the budget runs out.
///
/// At least one read is made; later reads are `interval` apart.
async fn poll_until_ready(
    ctx: &RunContext,
    watch: &NodeId,
    resource: &NodeId,
    kind: ResourceKind,
    route: &Route,
    outputs: &Value,
    ready: &[path::Segment],
) -> Resolution<Value> {
    let deadline = Instant::now() + ctx.poll.timeout;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let status = route
            .read(ResourceRef {
                node: resource.clone(),
                kind,
                outputs: outputs.clone(),
            })
            .await
            .map_err(|e| provider_failure(resource, kind, "read", e))?;

        let is_ready = path::apply(&status, ready).is_some();
        debug!(node = %watch, attempt, ready = is_ready, "status polled");
        ctx.events.emit(EventKind::StatusPolled {
            node: watch.as_arc(),
            attempt,
            ready: is_ready,
        });
        if is_ready {
            return Ok(status);
        }

        let now = Instant::now();
        if now + ctx.poll.interval > deadline {
            return Err(Arc::new(SkyError::Timeout {
                node: resource.to_string(),
                field: path::render(ready),
                timeout_ms: duration_ms(ctx.poll.timeout),
            }));
        }
        tokio::time::sleep(ctx.poll.interval).await;
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
