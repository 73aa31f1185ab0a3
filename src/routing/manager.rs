//! Request-facing backend selection.
//!
//! # Responsibilities
//! - Pick a backend for adhoc and routing-group requests
//! - Keep follow-up requests for a query on the backend that owns it
//! - Discover the owner of query ids the gateway has never seen
//!
//! # Design Decisions
//! - Uniform random choice over the active set, re-drawn on every call
//! - A paused or empty routing group falls back to adhoc; adhoc has no fallback
//! - One discovery round per query id at a time; concurrent misses share it
//! - Only confirmed owners are cached; the adhoc guess after a failed round is not

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::OnceCell;

use crate::backend::{BackendDescriptor, BackendDirectory};
use crate::config::{AffinityCacheConfig, DiscoveryConfig};
use crate::error::{RoutingError, RoutingResult};
use crate::groups::RoutingGroupRecord;
use crate::observability::metrics;
use crate::routing::affinity::AffinityCache;
use crate::routing::discovery::{Discovery, HttpQueryProber, QueryProber};
use crate::routing::snapshot::{RoutingSnapshot, SnapshotCell};
use crate::routing::ADHOC;

/// Shared result of one discovery round: the confirmed owner, if any.
type DiscoveryRound = Arc<OnceCell<Option<String>>>;

pub struct RoutingManager {
    directory: Arc<dyn BackendDirectory>,
    snapshot: SnapshotCell,
    cache: AffinityCache,
    in_flight: DashMap<String, DiscoveryRound>,
    discovery: Discovery,
    #[cfg(test)]
    rounds: AtomicUsize,
}

/// Unregisters a discovery round once its last waiter is gone, including
/// waiters whose future was dropped mid-round.
struct RoundGuard<'a> {
    in_flight: &'a DashMap<String, DiscoveryRound>,
    query_id: &'a str,
    round: Option<DiscoveryRound>,
}

impl<'a> RoundGuard<'a> {
    /// Join the round in flight for `query_id`, registering a new one if none is.
    fn join(in_flight: &'a DashMap<String, DiscoveryRound>, query_id: &'a str) -> Self {
        let round = in_flight
            .entry(query_id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();
        Self {
            in_flight,
            query_id,
            round: Some(round),
        }
    }
}

impl Drop for RoundGuard<'_> {
    fn drop(&mut self) {
        let Some(round) = self.round.take() else {
            return;
        };
        let ptr = Arc::as_ptr(&round);
        drop(round);
        // Clones are only taken under the shard lock, so a count of one means
        // the map holds the last reference.
        self.in_flight.remove_if(self.query_id, |_, current| {
            Arc::as_ptr(current) == ptr && Arc::strong_count(current) == 1
        });
    }
}

impl RoutingManager {
    pub fn new(
        directory: Arc<dyn BackendDirectory>,
        prober: Arc<dyn QueryProber>,
        discovery: &DiscoveryConfig,
        cache: &AffinityCacheConfig,
    ) -> Self {
        Self {
            directory,
            snapshot: SnapshotCell::new(),
            cache: AffinityCache::new(cache.capacity, Duration::from_secs(cache.idle_ttl_secs)),
            in_flight: DashMap::new(),
            discovery: Discovery::new(
                prober,
                discovery.max_concurrent_probes,
                Duration::from_millis(discovery.deadline_ms),
            ),
            #[cfg(test)]
            rounds: AtomicUsize::new(0),
        }
    }

    /// Routing manager that probes backends over HTTP.
    pub fn with_http_prober(
        directory: Arc<dyn BackendDirectory>,
        discovery: &DiscoveryConfig,
        cache: &AffinityCacheConfig,
    ) -> Self {
        let prober = Arc::new(HttpQueryProber::from_config(discovery));
        Self::new(directory, prober, discovery, cache)
    }

    /// Current routing snapshot.
    pub fn snapshot(&self) -> Arc<RoutingSnapshot> {
        self.snapshot.load()
    }

    /// Publish backends and routing groups from one refresh as a single snapshot.
    pub fn refresh_snapshot(&self, backends: &[BackendDescriptor], groups: &[RoutingGroupRecord]) {
        self.snapshot.replace(backends, groups);
        tracing::debug!(
            backends = backends.len(),
            groups = groups.len(),
            "Routing snapshot published"
        );
    }

    /// Replace the routing-group active flags.
    pub fn update_routing_groups(&self, groups: &[RoutingGroupRecord]) {
        self.snapshot.replace_groups(groups);
        tracing::debug!(count = groups.len(), "Routing groups updated");
    }

    /// Replace the backend name to address map.
    pub fn update_backend_proxy_map(&self, backends: &[BackendDescriptor]) {
        self.snapshot.replace_backends(backends);
        tracing::debug!(count = backends.len(), "Backend proxy map updated");
    }

    /// Pick a random active adhoc backend.
    pub async fn provide_adhoc_backend(&self) -> RoutingResult<String> {
        let backends = self.directory.get_active_adhoc_backends().await?;

        if backends.is_empty() {
            metrics::record_route_decision(ADHOC, "unavailable");
            return Err(RoutingError::NoBackendsAvailable(ADHOC.to_string()));
        }

        if !self.snapshot.load().is_group_active(ADHOC) {
            metrics::record_route_decision(ADHOC, "paused");
            return Err(RoutingError::GroupPaused(ADHOC.to_string()));
        }

        metrics::record_route_decision(ADHOC, "selected");
        Ok(pick_uniform(&backends).address.clone())
    }

    /// Pick a random active backend of `routing_group`, falling back to adhoc
    /// when the group is paused or has no active backends.
    pub async fn provide_backend_for_routing_group(
        &self,
        routing_group: &str,
    ) -> RoutingResult<String> {
        let backends = self.directory.get_active_backends(routing_group).await?;

        if backends.is_empty() || !self.snapshot.load().is_group_active(routing_group) {
            tracing::warn!(
                group = %routing_group,
                active_backends = backends.len(),
                "Routing group is paused or has no active backends, routing to adhoc"
            );
            metrics::record_route_decision(routing_group, "fallback");
            return self.provide_adhoc_backend().await;
        }

        metrics::record_route_decision(routing_group, "selected");
        Ok(pick_uniform(&backends).address.clone())
    }

    /// Remember the backend chosen for a new query.
    pub fn set_backend_for_query_id(&self, query_id: &str, address: &str) {
        self.cache.insert(query_id, address);
    }

    /// Backend that owns `query_id`.
    ///
    /// Served from the affinity cache when possible; otherwise every known backend
    /// is asked. If none confirms, the first active adhoc backend is returned as an
    /// uncached guess.
    pub async fn find_backend_for_query_id(&self, query_id: &str) -> RoutingResult<String> {
        if let Some(address) = self.cache.get(query_id) {
            return Ok(address);
        }

        let guard = RoundGuard::join(&self.in_flight, query_id);
        let confirmed = match guard.round.as_deref() {
            Some(round) => round
                .get_or_init(|| self.find_backend_for_unknown_query_id(query_id))
                .await
                .clone(),
            None => None,
        };
        drop(guard);

        match confirmed {
            Some(address) => Ok(address),
            None => self.fallback_backend(query_id).await,
        }
    }

    /// Drop affinity entries that have been idle past the TTL.
    pub fn purge_expired_affinity(&self) -> usize {
        self.cache.purge_expired()
    }

    async fn find_backend_for_unknown_query_id(&self, query_id: &str) -> Option<String> {
        #[cfg(test)]
        self.rounds.fetch_add(1, Ordering::SeqCst);

        // A round that finished just before this one was registered may have
        // populated the cache already.
        if let Some(address) = self.cache.get(query_id) {
            return Some(address);
        }

        let addresses: Vec<String> = self
            .snapshot
            .load()
            .backend_addresses()
            .values()
            .cloned()
            .collect();

        match self.discovery.discover(query_id, addresses).await {
            Ok(address) => {
                self.cache.insert(query_id, &address);
                Some(address)
            }
            Err(_) => None,
        }
    }

    async fn fallback_backend(&self, query_id: &str) -> RoutingResult<String> {
        let backends = self.directory.get_active_adhoc_backends().await?;
        match backends.first() {
            Some(backend) => {
                tracing::warn!(
                    query_id = %query_id,
                    backend = %backend.address,
                    "Query owner unknown, falling back to first adhoc backend"
                );
                Ok(backend.address.clone())
            }
            None => Err(RoutingError::QueryNotFound(query_id.to_string())),
        }
    }
}

fn pick_uniform(backends: &[BackendDescriptor]) -> &BackendDescriptor {
    let index = rand::thread_rng().gen_range(0..backends.len());
    &backends[index]
}
