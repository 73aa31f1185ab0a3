//! Queue-length observer.
//!
//! Turns a stats batch into `routing_group → (cluster_id → queued queries)` and
//! publishes it to the queue-length routing table in one swap. Unhealthy and
//! worker-less clusters are left out of that tick.

use std::sync::Arc;

use crate::health::observer::{ObserverChain, ObserverError};
use crate::health::stats::ClusterStats;
use crate::routing::queue_length::{QueueLengthMap, QueueLengthRoutingTable};

pub struct QueueLengthObserver {
    table: Arc<QueueLengthRoutingTable>,
}

impl QueueLengthObserver {
    pub fn new(table: Arc<QueueLengthRoutingTable>) -> Self {
        Self { table }
    }

    pub fn observe(&self, stats: &[ClusterStats]) -> Result<(), ObserverError> {
        self.table.update_routing_table(queue_length_map(stats));
        Ok(())
    }

    /// Register this observer on `chain`.
    pub fn register(self, chain: &mut ObserverChain) {
        chain.register("queue-length", move |stats| self.observe(stats));
    }
}

/// Queue depth per cluster, grouped by routing group, for routable clusters only.
pub fn queue_length_map(stats: &[ClusterStats]) -> QueueLengthMap {
    let mut map = QueueLengthMap::new();
    for stat in stats.iter().filter(|s| s.is_routable()) {
        map.entry(stat.routing_group.clone())
            .or_default()
            .insert(stat.cluster_id.clone(), stat.queued_query_count);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(id: &str, group: &str, healthy: bool, workers: u32, queued: u32) -> ClusterStats {
        ClusterStats {
            cluster_id: id.into(),
            routing_group: group.into(),
            healthy,
            num_worker_nodes: workers,
            queued_query_count: queued,
            running_query_count: 0,
            blocked_query_count: 0,
        }
    }

    #[test]
    fn test_excludes_unhealthy_and_workerless_clusters() {
        let table = Arc::new(QueueLengthRoutingTable::new());
        let observer = QueueLengthObserver::new(table.clone());

        observer
            .observe(&[
                stats("X", "etl", false, 5, 1),
                stats("Y", "etl", true, 0, 2),
                stats("Z", "etl", true, 3, 7),
            ])
            .unwrap();

        let etl = table.queue_lengths("etl").unwrap();
        assert_eq!(etl.len(), 1);
        assert_eq!(etl["Z"], 7);
        assert!(!etl.contains_key("X"));
        assert!(!etl.contains_key("Y"));
    }

    #[test]
    fn test_groups_by_routing_group_and_recovers() {
        let table = Arc::new(QueueLengthRoutingTable::new());
        let mut chain = ObserverChain::new();
        QueueLengthObserver::new(table.clone()).register(&mut chain);

        chain.deliver(&[
            stats("a1", "adhoc", true, 2, 0),
            stats("e1", "etl", false, 2, 4),
        ]);
        assert!(table.queue_lengths("etl").is_none());
        assert_eq!(table.queue_lengths("adhoc").unwrap()["a1"], 0);

        chain.deliver(&[
            stats("a1", "adhoc", true, 2, 3),
            stats("e1", "etl", true, 2, 4),
        ]);
        assert_eq!(table.queue_lengths("etl").unwrap()["e1"], 4);
        assert_eq!(table.least_queued_cluster("adhoc"), Some(("a1".to_string(), 3)));
    }
}
