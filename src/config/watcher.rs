//! Configuration file watcher for hot reload.
//!
//! Each accepted edit is compared with the last accepted configuration. The
//! backend list and routing-group seeds apply live; every other section is
//! only read at startup, so changes to those are reported as needing a restart.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// A validated configuration edit.
#[derive(Debug, Clone)]
pub struct ConfigReload {
    /// The newly accepted configuration.
    pub config: GatewayConfig,

    /// Whether the backend list differs from the previous configuration.
    pub backends_changed: bool,

    /// Whether the routing-group seeds differ from the previous configuration.
    pub routing_groups_changed: bool,

    /// Changed sections that only take effect after a restart.
    pub restart_required: Vec<&'static str>,
}

impl ConfigReload {
    /// Compare `next` with `previous`. `None` when nothing changed.
    pub fn between(previous: &GatewayConfig, next: GatewayConfig) -> Option<Self> {
        if *previous == next {
            return None;
        }

        Some(Self {
            backends_changed: previous.backends != next.backends,
            routing_groups_changed: previous.routing_groups != next.routing_groups,
            restart_required: restart_required(previous, &next),
            config: next,
        })
    }
}

/// Sections of `next` that differ from `previous` and are fixed at startup.
pub fn restart_required(previous: &GatewayConfig, next: &GatewayConfig) -> Vec<&'static str> {
    let mut sections = Vec::new();
    if previous.listener != next.listener {
        sections.push("listener");
    }
    if previous.monitor != next.monitor {
        sections.push("monitor");
    }
    if previous.discovery != next.discovery {
        sections.push("discovery");
    }
    if previous.affinity_cache != next.affinity_cache {
        sections.push("affinity_cache");
    }
    if previous.refresh != next.refresh {
        sections.push("refresh");
    }
    if previous.store != next.store {
        sections.push("store");
    }
    if previous.observability != next.observability {
        sections.push("observability");
    }
    sections
}

/// Watches the gateway config file and emits a `ConfigReload` per accepted edit.
pub struct ConfigWatcher {
    path: PathBuf,
    current: Arc<Mutex<GatewayConfig>>,
    update_tx: mpsc::UnboundedSender<ConfigReload>,
}

impl ConfigWatcher {
    /// Watcher for `path`, diffing edits against `initial`.
    pub fn new(
        path: &Path,
        initial: GatewayConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ConfigReload>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                current: Arc::new(Mutex::new(initial)),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for updates to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            current,
            update_tx,
        } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reload(&path, &current, &update_tx);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watched, "Config watcher started");
        Ok(watcher)
    }
}

fn reload(
    path: &Path,
    current: &Mutex<GatewayConfig>,
    update_tx: &mpsc::UnboundedSender<ConfigReload>,
) {
    let next = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Config reload rejected, keeping current configuration");
            return;
        }
    };

    let mut current = match current.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let Some(reload) = ConfigReload::between(&current, next) else {
        tracing::debug!(path = ?path, "Config file touched without changes");
        return;
    };

    *current = reload.config.clone();
    tracing::info!(
        path = ?path,
        backends_changed = reload.backends_changed,
        routing_groups_changed = reload.routing_groups_changed,
        "Config change detected"
    );
    let _ = update_tx.send(reload);
}
