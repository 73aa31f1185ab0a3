//! Routing snapshot refresh.
//!
//! # Responsibilities
//! - Re-pull backends and reconciled routing groups into the routing manager
//! - Run on a fixed interval and immediately after any routing-group change
//!
//! # Design Decisions
//! - A failed pass keeps the previous snapshot and is retried on the next wake-up
//! - Staleness after a pause/resume is one refresh pass, not one interval

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Notify};
use tokio::time;

use crate::backend::BackendDirectory;
use crate::error::RoutingResult;
use crate::groups::RoutingGroupManager;
use crate::observability::metrics;
use crate::routing::manager::RoutingManager;

pub struct SnapshotRefresher {
    directory: Arc<dyn BackendDirectory>,
    groups: Arc<RoutingGroupManager>,
    routing: Arc<RoutingManager>,
    signal: Arc<Notify>,
    interval: Duration,
}

impl SnapshotRefresher {
    pub fn new(
        directory: Arc<dyn BackendDirectory>,
        groups: Arc<RoutingGroupManager>,
        routing: Arc<RoutingManager>,
        interval: Duration,
    ) -> Self {
        let signal = groups.refresh_signal();
        Self {
            directory,
            groups,
            routing,
            signal,
            interval,
        }
    }

    /// Pull the current topology and group state into the routing snapshot.
    pub async fn refresh_once(&self) -> RoutingResult<()> {
        let backends = self.directory.get_all_backends().await?;
        let groups = self.groups.get_all_routing_groups(&backends).await?;

        self.routing.refresh_snapshot(&backends, &groups);

        let purged = self.routing.purge_expired_affinity();
        if purged > 0 {
            tracing::debug!(purged, "Expired affinity entries removed");
        }
        metrics::record_snapshot_refresh(backends.len(), groups.len());
        Ok(())
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Snapshot refresher starting");

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.signal.notified() => {
                    tracing::debug!("Refresh requested");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Snapshot refresher received shutdown signal, exiting loop");
                    break;
                }
            }

            if let Err(e) = self.refresh_once().await {
                tracing::error!(error = %e, "Snapshot refresh failed, keeping previous snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendDescriptor, InMemoryBackendDirectory};
    use crate::config::{AffinityCacheConfig, DiscoveryConfig};
    use crate::groups::{InMemoryRoutingGroupStore, RoutingGroupRecord};
    use crate::lifecycle::Shutdown;

    fn setup() -> (Arc<RoutingGroupManager>, Arc<RoutingManager>, SnapshotRefresher) {
        let directory = Arc::new(InMemoryBackendDirectory::new(vec![
            BackendDescriptor::new("a1", "http://a1:8080", "adhoc", true),
            BackendDescriptor::new("e1", "http://e1:8080", "etl", true),
        ]));
        let groups = Arc::new(RoutingGroupManager::new(Arc::new(InMemoryRoutingGroupStore::new())));
        let routing = Arc::new(RoutingManager::with_http_prober(
            directory.clone(),
            &DiscoveryConfig::default(),
            &AffinityCacheConfig::default(),
        ));
        let refresher = SnapshotRefresher::new(
            directory,
            groups.clone(),
            routing.clone(),
            Duration::from_secs(3600),
        );
        (groups, routing, refresher)
    }

    #[tokio::test]
    async fn test_refresh_once_populates_snapshot() {
        let (groups, routing, refresher) = setup();
        groups.add_routing_group(&RoutingGroupRecord::new("etl", false)).await.unwrap();

        refresher.refresh_once().await.unwrap();
        let snapshot = routing.snapshot();
        assert_eq!(snapshot.backend_addresses().len(), 2);
        assert!(!snapshot.is_group_active("etl"));
    }

    #[tokio::test]
    async fn test_pause_propagates_without_waiting_for_interval() {
        let (groups, routing, refresher) = setup();
        groups.add_routing_group(&RoutingGroupRecord::named("etl")).await.unwrap();

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(refresher.run(shutdown.subscribe()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(routing.snapshot().is_group_active("etl"));

        groups.pause_routing_group("etl").await.unwrap();
        let mut paused = false;
        for _ in 0..50 {
            if !routing.snapshot().is_group_active("etl") {
                paused = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(paused, "pause should reach the snapshot well before the hourly tick");

        shutdown.trigger();
        handle.await.unwrap();
    }
}
