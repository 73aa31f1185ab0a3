//! Gateway facade.
//!
//! The surface the admin API and any embedding request path call into. It ties
//! the backend directory, routing-group manager, routing manager and queue-length
//! table together and keeps the routing snapshot in step with backend changes.

use std::sync::Arc;

use crate::backend::descriptor::normalize_address;
use crate::backend::{BackendDescriptor, BackendDirectory, InMemoryBackendDirectory};
use crate::error::{RoutingError, RoutingResult};
use crate::groups::{RoutingGroupManager, RoutingGroupRecord};
use crate::routing::queue_length::{ClusterQueueMap, QueueLengthMap};
use crate::routing::{QueueLengthRoutingTable, RoutingManager};

pub struct Gateway {
    directory: Arc<InMemoryBackendDirectory>,
    groups: Arc<RoutingGroupManager>,
    routing: Arc<RoutingManager>,
    queue_lengths: Arc<QueueLengthRoutingTable>,
}

impl Gateway {
    pub fn new(
        directory: Arc<InMemoryBackendDirectory>,
        groups: Arc<RoutingGroupManager>,
        routing: Arc<RoutingManager>,
        queue_lengths: Arc<QueueLengthRoutingTable>,
    ) -> Self {
        Self {
            directory,
            groups,
            routing,
            queue_lengths,
        }
    }

    pub fn directory(&self) -> &Arc<InMemoryBackendDirectory> {
        &self.directory
    }

    pub fn groups(&self) -> &Arc<RoutingGroupManager> {
        &self.groups
    }

    pub fn routing(&self) -> &Arc<RoutingManager> {
        &self.routing
    }

    // Selection

    pub async fn select_adhoc_backend(&self) -> RoutingResult<String> {
        self.routing.provide_adhoc_backend().await
    }

    pub async fn select_backend_for_group(&self, routing_group: &str) -> RoutingResult<String> {
        self.routing.provide_backend_for_routing_group(routing_group).await
    }

    pub async fn resolve_backend_for_query(&self, query_id: &str) -> RoutingResult<String> {
        self.routing.find_backend_for_query_id(query_id).await
    }

    /// Record that `query_id` was submitted to the backend at `address`.
    ///
    /// Only addresses in the current routing snapshot are accepted.
    pub fn record_query_backend(&self, query_id: &str, address: &str) -> RoutingResult<()> {
        let address = normalize_address(address)
            .ok_or_else(|| RoutingError::UnknownBackendAddress(address.to_string()))?;
        let snapshot = self.routing.snapshot();
        if !snapshot.backend_addresses().values().any(|known| *known == address) {
            tracing::warn!(
                query_id = %query_id,
                address = %address,
                "Rejected query record for unknown backend"
            );
            return Err(RoutingError::UnknownBackendAddress(address));
        }

        self.routing.set_backend_for_query_id(query_id, &address);
        Ok(())
    }

    // Routing groups

    pub async fn list_routing_groups(&self) -> RoutingResult<Vec<RoutingGroupRecord>> {
        let backends = self.directory.get_all_backends().await?;
        self.groups.get_all_routing_groups(&backends).await
    }

    pub async fn add_routing_group(&self, group: &RoutingGroupRecord) -> RoutingResult<()> {
        self.groups.add_routing_group(group).await
    }

    pub async fn upsert_routing_group(&self, group: &RoutingGroupRecord) -> RoutingResult<()> {
        self.groups.update_routing_group(group).await
    }

    pub async fn delete_routing_group(&self, name: &str) -> RoutingResult<()> {
        self.groups.delete_routing_groups(name).await
    }

    pub async fn pause_group(&self, name: &str) -> RoutingResult<()> {
        self.groups.pause_routing_group(name).await
    }

    pub async fn resume_group(&self, name: &str) -> RoutingResult<()> {
        self.groups.resume_routing_group(name).await
    }

    // Backends

    pub async fn list_backends(&self) -> RoutingResult<Vec<BackendDescriptor>> {
        Ok(self.directory.get_all_backends().await?)
    }

    pub async fn list_active_backends(&self) -> RoutingResult<Vec<BackendDescriptor>> {
        Ok(self.directory.get_all_active_backends().await?)
    }

    pub fn activate_backend(&self, name: &str) -> RoutingResult<()> {
        self.directory.activate_backend(name)?;
        tracing::info!(backend = %name, "Backend activated");
        self.request_refresh();
        Ok(())
    }

    pub fn deactivate_backend(&self, name: &str) -> RoutingResult<()> {
        self.directory.deactivate_backend(name)?;
        tracing::info!(backend = %name, "Backend deactivated");
        self.request_refresh();
        Ok(())
    }

    pub fn add_backend(&self, backend: BackendDescriptor) -> RoutingResult<BackendDescriptor> {
        let backend = self.directory.add_backend(backend)?;
        self.request_refresh();
        Ok(backend)
    }

    pub fn update_backend(&self, backend: BackendDescriptor) -> RoutingResult<BackendDescriptor> {
        let backend = self.directory.update_backend(backend)?;
        self.request_refresh();
        Ok(backend)
    }

    pub fn remove_backend(&self, name: &str) -> RoutingResult<()> {
        self.directory.remove_backend(name)?;
        self.request_refresh();
        Ok(())
    }

    /// Swap in a new backend list, e.g. after a config reload.
    pub fn replace_backends(&self, backends: Vec<BackendDescriptor>) {
        tracing::info!(count = backends.len(), "Backend list replaced");
        self.directory.replace_all(backends);
        self.request_refresh();
    }

    // Load

    pub fn queue_lengths(&self) -> Arc<QueueLengthMap> {
        self.queue_lengths.snapshot()
    }

    pub fn group_queue_lengths(&self, routing_group: &str) -> Option<ClusterQueueMap> {
        self.queue_lengths.queue_lengths(routing_group)
    }

    fn request_refresh(&self) {
        self.groups.refresh_signal().notify_one();
    }
}
