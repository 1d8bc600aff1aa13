//! Teardown: delete created resources in reverse dependency order

use tracing::{info, instrument, warn};

use super::{Deployment, Engine};
use crate::error::{Result, SkyError};
use crate::event_log::EventKind;
use crate::graph::EntryKind;
use crate::provider::ResourceRef;

impl Engine {
    /// Delete every resource `deployment` created, dependents first.
    ///
    /// Lookups, bindings and watches own nothing remote and are left alone.
    /// Stops at the first failed delete so nothing is removed out from
    /// under a resource that still exists.
    #[instrument(skip(self, deployment), fields(graph = deployment.name()))]
    pub async fn destroy(&self, deployment: &Deployment) -> Result<()> {
        let mut deleted = 0usize;
        for id in deployment.order().iter().rev() {
            let Some(record) = deployment.record(id.as_str()) else {
                continue;
            };
            let EntryKind::Resource(kind) = record.entry else {
                continue;
            };
            if !record.is_created() {
                continue;
            }
            let Some(route) = record.route.clone() else {
                continue;
            };

            let target = ResourceRef {
                node: id.clone(),
                kind,
                outputs: (*record.outputs).clone(),
            };
            if let Err(e) = route.delete(target).await {
                warn!(node = %id, error = %e, "delete failed, stopping teardown");
                return Err(SkyError::provider(
                    id.as_str(),
                    kind,
                    "delete",
                    format!("{:#}", e),
                ));
            }

            deployment.state().mark_deleted(id.as_str());
            deployment.events().emit(EventKind::NodeDeleted {
                node: id.as_arc(),
            });
            info!(node = %id, provider = route.name(), "deleted");
            deleted += 1;
        }
        info!(deleted, "Teardown finished");
        Ok(())
    }
}
