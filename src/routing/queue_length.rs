//! Queue-length routing table.
//!
//! Holds the latest `routing_group → (cluster_id → queued queries)` mapping
//! published by the queue-length observer. The whole mapping is swapped at once,
//! so a reader always sees every cluster of a group from the same stats tick.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// Cluster id to queued query count.
pub type ClusterQueueMap = HashMap<String, u32>;

/// Routing group to its cluster queue map.
pub type QueueLengthMap = HashMap<String, ClusterQueueMap>;

#[derive(Debug, Default)]
pub struct QueueLengthRoutingTable {
    table: ArcSwap<QueueLengthMap>,
}

impl QueueLengthRoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table.
    pub fn update_routing_table(&self, table: QueueLengthMap) {
        self.table.store(Arc::new(table));
    }

    pub fn snapshot(&self) -> Arc<QueueLengthMap> {
        self.table.load_full()
    }

    /// Queue lengths of the eligible clusters in `group`.
    pub fn queue_lengths(&self, group: &str) -> Option<ClusterQueueMap> {
        self.table.load().get(group).cloned()
    }

    /// Cluster in `group` with the fewest queued queries.
    /// In case of tie, the lowest cluster id is selected (stability)
    pub fn least_queued_cluster(&self, group: &str) -> Option<(String, u32)> {
        let table = self.table.load();
        table
            .get(group)?
            .iter()
            .min_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(id, queued)| (id.clone(), *queued))
    }
}
