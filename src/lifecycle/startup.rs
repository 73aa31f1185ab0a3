//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the backend directory, routing-group store and routing manager from config
//! - Seed routing groups and publish the first routing snapshot
//! - Start background tasks (snapshot refresh, stats monitor, config reload)
//!
//! # Design Decisions
//! - Fail fast: a store that cannot be loaded or an initial refresh error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The admin listener is bound by the caller once `start` returns

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::backend::{BackendDescriptor, InMemoryBackendDirectory};
use crate::config::{ConfigReload, ConfigWatcher, GatewayConfig};
use crate::error::{RoutingError, StoreError};
use crate::gateway::Gateway;
use crate::groups::{InMemoryRoutingGroupStore, RoutingGroupManager, RoutingGroupRecord, RoutingGroupStore};
use crate::health::{ClusterStatsMonitor, ObserverChain, QueueLengthObserver};
use crate::lifecycle::Shutdown;
use crate::routing::{QueueLengthRoutingTable, RoutingManager, SnapshotRefresher};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load routing-group store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to initialize routing: {0}")]
    Routing(#[from] RoutingError),

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),
}

/// Running gateway: the facade plus the background tasks that keep it current.
pub struct GatewayRuntime {
    pub gateway: Arc<Gateway>,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
    _watcher: Option<RecommendedWatcher>,
}

impl GatewayRuntime {
    /// Stop background tasks and wait up to `grace` for them to exit.
    pub async fn shutdown(self, grace: Duration) {
        self.shutdown.trigger();
        let all = futures_util::future::join_all(self.tasks);
        if tokio::time::timeout(grace, all).await.is_err() {
            tracing::warn!(grace = ?grace, "Background tasks did not stop in time");
        }
        tracing::info!("Background tasks stopped");
    }
}

/// Build every subsystem and start the background loops.
///
/// When `config_path` is given, edits to that file replace the backend list and
/// seed new routing groups.
pub async fn start(
    config: &GatewayConfig,
    config_path: Option<&Path>,
) -> Result<GatewayRuntime, StartupError> {
    let directory = Arc::new(InMemoryBackendDirectory::from_config(&config.backends));

    let store: Arc<dyn RoutingGroupStore> = match &config.store.persistence_path {
        Some(path) => Arc::new(InMemoryRoutingGroupStore::load_from_file(path)?),
        None => Arc::new(InMemoryRoutingGroupStore::new()),
    };
    let backends: Vec<BackendDescriptor> = config.backends.iter().map(BackendDescriptor::from).collect();
    seed_routing_groups(store.as_ref(), config, &backends).await?;

    let groups = Arc::new(RoutingGroupManager::new(store));
    let routing = Arc::new(RoutingManager::with_http_prober(
        directory.clone(),
        &config.discovery,
        &config.affinity_cache,
    ));
    let queue_lengths = Arc::new(QueueLengthRoutingTable::new());
    let gateway = Arc::new(Gateway::new(
        directory.clone(),
        groups.clone(),
        routing.clone(),
        queue_lengths.clone(),
    ));

    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    let refresher = SnapshotRefresher::new(
        directory.clone(),
        groups,
        routing,
        Duration::from_secs(config.refresh.interval_secs),
    );
    refresher.refresh_once().await?;
    tasks.push(tokio::spawn(refresher.run(shutdown.subscribe())));

    let mut observers = ObserverChain::new();
    QueueLengthObserver::new(queue_lengths).register(&mut observers);
    let monitor = ClusterStatsMonitor::new(directory, observers, config.monitor.clone());
    tasks.push(tokio::spawn(monitor.run(shutdown.subscribe())));

    let watcher = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            let watcher = watcher.run()?;
            tasks.push(tokio::spawn(apply_config_updates(
                gateway.clone(),
                updates,
                shutdown.subscribe(),
            )));
            Some(watcher)
        }
        None => None,
    };

    tracing::info!(
        backends = config.backends.len(),
        routing_groups = config.routing_groups.len(),
        "Gateway started"
    );

    Ok(GatewayRuntime {
        gateway,
        shutdown,
        tasks,
        _watcher: watcher,
    })
}

/// Persist configured routing groups, plus any group a backend names, that the
/// store does not know yet. Existing records keep their stored state.
pub async fn seed_routing_groups(
    store: &dyn RoutingGroupStore,
    config: &GatewayConfig,
    backends: &[BackendDescriptor],
) -> Result<(), StoreError> {
    let configured = config
        .routing_groups
        .iter()
        .map(|g| RoutingGroupRecord::new(g.name.clone(), g.active));
    let implied = backends
        .iter()
        .map(|b| RoutingGroupRecord::named(b.routing_group.clone()));

    for record in configured.chain(implied) {
        if store.find_by_name(&record.name).await?.is_none() {
            store.create(&record).await?;
            tracing::debug!(group = %record.name, active = record.active, "Routing group seeded");
        }
    }
    Ok(())
}

async fn apply_config_updates(
    gateway: Arc<Gateway>,
    mut updates: mpsc::UnboundedReceiver<ConfigReload>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(reload) = update else { break };
                apply_reload(&gateway, &reload).await;
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Apply the live parts of a config edit to a running gateway.
pub async fn apply_reload(gateway: &Gateway, reload: &ConfigReload) {
    let config = &reload.config;

    if reload.routing_groups_changed {
        for group in &config.routing_groups {
            let record = RoutingGroupRecord::new(group.name.clone(), group.active);
            match gateway.add_routing_group(&record).await {
                Ok(()) => tracing::info!(group = %group.name, "Routing group added from config"),
                Err(RoutingError::DuplicateGroup(_)) => {}
                Err(e) => tracing::error!(group = %group.name, error = %e, "Failed to seed routing group"),
            }
        }
    }

    if reload.backends_changed {
        let backends = config.backends.iter().map(BackendDescriptor::from).collect();
        gateway.replace_backends(backends);
    }

    if !reload.restart_required.is_empty() {
        tracing::warn!(
            sections = ?reload.restart_required,
            "Config sections changed that only apply after a restart"
        );
    }
    tracing::info!("Configuration reloaded");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, MonitorConfig, RoutingGroupConfig};

    fn config() -> GatewayConfig {
        GatewayConfig {
            backends: vec![
                BackendConfig {
                    name: "a1".into(),
                    routing_group: "adhoc".into(),
                    address: "http://127.0.0.1:1".into(),
                    active: true,
                },
                BackendConfig {
                    name: "e1".into(),
                    routing_group: "etl".into(),
                    address: "http://127.0.0.1:2".into(),
                    active: true,
                },
            ],
            routing_groups: vec![RoutingGroupConfig {
                name: "etl".into(),
                active: false,
            }],
            monitor: MonitorConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_state() {
        let store = InMemoryRoutingGroupStore::new();
        store.create(&RoutingGroupRecord::new("adhoc", false)).await.unwrap();

        let config = config();
        let backends: Vec<BackendDescriptor> =
            config.backends.iter().map(BackendDescriptor::from).collect();
        seed_routing_groups(&store, &config, &backends).await.unwrap();
        seed_routing_groups(&store, &config, &backends).await.unwrap();

        let names: Vec<(String, bool)> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|g| (g.name, g.active))
            .collect();
        assert_eq!(
            names,
            vec![("adhoc".to_string(), false), ("etl".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_start_publishes_initial_snapshot() {
        let runtime = start(&config(), None).await.unwrap();

        let snapshot = runtime.gateway.routing().snapshot();
        assert_eq!(snapshot.backend_addresses().len(), 2);
        assert!(!snapshot.is_group_active("etl"));

        // etl is paused, so routing to it lands on adhoc
        assert_eq!(
            runtime.gateway.select_backend_for_group("etl").await.unwrap(),
            "http://127.0.0.1:1"
        );

        runtime.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_reload_applies_backends_and_new_groups() {
        let initial = config();
        let runtime = start(&initial, None).await.unwrap();

        let mut next = initial.clone();
        next.backends[1].active = false;
        next.routing_groups.push(RoutingGroupConfig {
            name: "reporting".into(),
            active: true,
        });
        next.refresh.interval_secs = 1;
        let reload = ConfigReload::between(&initial, next).unwrap();
        assert_eq!(reload.restart_required, vec!["refresh"]);

        apply_reload(&runtime.gateway, &reload).await;

        let active = runtime.gateway.list_active_backends().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "a1");

        let groups = runtime.gateway.list_routing_groups().await.unwrap();
        assert!(groups.iter().any(|g| g.name == "reporting" && g.active));
        // Existing groups keep their stored state
        assert!(groups.iter().any(|g| g.name == "etl" && !g.active));

        runtime.shutdown(Duration::from_secs(1)).await;
    }
}
