//! Cluster statistics records.

use serde::{Deserialize, Serialize};

use crate::backend::BackendDescriptor;

/// Body of `GET /v1/cluster` on a query-engine cluster.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatsResponse {
    #[serde(default)]
    pub active_workers: u32,
    #[serde(default)]
    pub queued_queries: u32,
    #[serde(default)]
    pub running_queries: u32,
    #[serde(default)]
    pub blocked_queries: u32,
}

/// Load and health of one cluster at one poll tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStats {
    pub cluster_id: String,
    pub routing_group: String,
    pub healthy: bool,
    pub num_worker_nodes: u32,
    pub queued_query_count: u32,
    pub running_query_count: u32,
    pub blocked_query_count: u32,
}

impl ClusterStats {
    /// Stats for a cluster that answered its stats endpoint.
    pub fn from_response(backend: &BackendDescriptor, response: ClusterStatsResponse) -> Self {
        Self {
            cluster_id: backend.name.clone(),
            routing_group: backend.routing_group.clone(),
            healthy: true,
            num_worker_nodes: response.active_workers,
            queued_query_count: response.queued_queries,
            running_query_count: response.running_queries,
            blocked_query_count: response.blocked_queries,
        }
    }

    /// Stats for a cluster that could not be polled this tick.
    pub fn unhealthy(backend: &BackendDescriptor) -> Self {
        Self {
            cluster_id: backend.name.clone(),
            routing_group: backend.routing_group.clone(),
            healthy: false,
            num_worker_nodes: 0,
            queued_query_count: 0,
            running_query_count: 0,
            blocked_query_count: 0,
        }
    }

    /// Whether the cluster may receive queue-length based routing this tick.
    pub fn is_routable(&self) -> bool {
        self.healthy && self.num_worker_nodes > 0
    }
}
