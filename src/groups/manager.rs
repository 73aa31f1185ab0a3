//! Routing group management.
//!
//! # Responsibilities
//! - Merge live backend topology with persisted routing-group state
//! - Create, update, delete, pause and resume persisted groups
//! - Signal the snapshot refresher after every persisted change
//!
//! # Design Decisions
//! - Counters are recomputed from the supplied backends on every read
//! - Groups that exist only in the backend topology are not listed
//! - Mutations touch the store only; the routing snapshot catches up through
//!   the refresh signal

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::backend::BackendDescriptor;
use crate::error::{RoutingError, RoutingResult};
use crate::groups::record::RoutingGroupRecord;
use crate::groups::store::RoutingGroupStore;

pub struct RoutingGroupManager {
    store: Arc<dyn RoutingGroupStore>,
    refresh: Arc<Notify>,
}

impl RoutingGroupManager {
    pub fn new(store: Arc<dyn RoutingGroupStore>) -> Self {
        Self {
            store,
            refresh: Arc::new(Notify::new()),
        }
    }

    /// Signal fired after every persisted change.
    pub fn refresh_signal(&self) -> Arc<Notify> {
        self.refresh.clone()
    }

    /// Persisted routing groups with counters taken from `backends`.
    pub async fn get_all_routing_groups(
        &self,
        backends: &[BackendDescriptor],
    ) -> RoutingResult<Vec<RoutingGroupRecord>> {
        let live = groups_from_backends(backends);
        let mut groups = self.store.find_all().await?;

        for group in &mut groups {
            let (number_of_clusters, active_clusters) = live
                .get(group.name.as_str())
                .map(|g| (g.number_of_clusters, g.active_clusters))
                .unwrap_or((0, 0));
            group.number_of_clusters = number_of_clusters;
            group.active_clusters = active_clusters;
        }

        Ok(groups)
    }

    /// Add a new routing group.
    pub async fn add_routing_group(&self, group: &RoutingGroupRecord) -> RoutingResult<()> {
        self.store.create(group).await?;
        tracing::info!(group = %group.name, active = group.active, "Routing group added");
        self.invalidate();
        Ok(())
    }

    /// Update a routing group, adding it if it does not exist yet.
    pub async fn update_routing_group(&self, group: &RoutingGroupRecord) -> RoutingResult<()> {
        match self.store.find_by_name(&group.name).await? {
            Some(_) => self.store.update(group).await?,
            None => self.store.create(group).await?,
        }
        tracing::info!(group = %group.name, active = group.active, "Routing group updated");
        self.invalidate();
        Ok(())
    }

    /// Delete a routing group. Deleting a missing group is a no-op.
    pub async fn delete_routing_groups(&self, name: &str) -> RoutingResult<()> {
        self.store.delete(name).await?;
        tracing::info!(group = %name, "Routing group deleted");
        self.invalidate();
        Ok(())
    }

    pub async fn pause_routing_group(&self, name: &str) -> RoutingResult<()> {
        self.set_active(name, false).await
    }

    pub async fn resume_routing_group(&self, name: &str) -> RoutingResult<()> {
        self.set_active(name, true).await
    }

    async fn set_active(&self, name: &str, active: bool) -> RoutingResult<()> {
        let mut record = self
            .store
            .find_by_name(name)
            .await?
            .ok_or_else(|| RoutingError::GroupNotFound(name.to_string()))?;
        record.active = active;
        self.store.update(&record).await?;
        tracing::info!(group = %name, active, "Routing group state changed");
        self.invalidate();
        Ok(())
    }

    fn invalidate(&self) {
        // notify_one stores a permit, so a refresher that is mid-pass still sees it.
        self.refresh.notify_one();
    }
}

/// Whether the routing group `name` in `groups` is active.
pub fn is_routing_group_active(groups: &[RoutingGroupRecord], name: &str) -> RoutingResult<bool> {
    get_by_name(groups, name)
        .map(|g| g.active)
        .ok_or_else(|| RoutingError::GroupNotFound(name.to_string()))
}

/// The routing group called `name` in `groups`, if any.
pub fn get_by_name<'a>(
    groups: &'a [RoutingGroupRecord],
    name: &str,
) -> Option<&'a RoutingGroupRecord> {
    groups.iter().find(|g| g.name == name)
}

/// Group the backends by routing group, counting total and active members.
fn groups_from_backends(backends: &[BackendDescriptor]) -> HashMap<&str, RoutingGroupRecord> {
    let mut groups: HashMap<&str, RoutingGroupRecord> = HashMap::new();
    for backend in backends {
        groups
            .entry(backend.routing_group.as_str())
            .or_insert_with(|| RoutingGroupRecord::named(backend.routing_group.clone()))
            .register_backend(backend);
    }
    groups
}
