//! Cluster stats monitor.
//!
//! # Responsibilities
//! - Periodically poll every active backend's stats endpoint
//! - Turn each answer (or failure) into a `ClusterStats` record
//! - Deliver the full batch to the observer chain

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::backend::{BackendDescriptor, BackendDirectory};
use crate::config::MonitorConfig;
use crate::health::observer::ObserverChain;
use crate::health::stats::{ClusterStats, ClusterStatsResponse};
use crate::observability::metrics;

/// Upper bound on a stats response body.
const MAX_STATS_BODY_BYTES: usize = 64 * 1024;

pub struct ClusterStatsMonitor {
    directory: Arc<dyn BackendDirectory>,
    observers: ObserverChain,
    config: MonitorConfig,
    client: Client<HttpConnector, Body>,
}

impl ClusterStatsMonitor {
    pub fn new(
        directory: Arc<dyn BackendDirectory>,
        observers: ObserverChain,
        config: MonitorConfig,
    ) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeout_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            directory,
            observers,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Cluster stats monitor disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            observers = self.observers.len(),
            "Cluster stats monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cluster stats monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Poll once and hand the batch to every observer.
    pub async fn tick(&self) -> Vec<ClusterStats> {
        let stats = self.poll_all().await;
        let failures = self.observers.deliver(&stats);
        if failures > 0 {
            tracing::warn!(failures, "Some stats observers failed this tick");
        }
        stats
    }

    /// One stats record per active backend, in directory order.
    pub async fn poll_all(&self) -> Vec<ClusterStats> {
        let backends = match self.directory.get_all_active_backends().await {
            Ok(backends) => backends,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list active backends for stats poll");
                return Vec::new();
            }
        };

        let stats = join_all(backends.iter().map(|backend| self.poll(backend))).await;
        for stat in &stats {
            metrics::record_cluster_stats(stat);
        }
        stats
    }

    async fn poll(&self, backend: &BackendDescriptor) -> ClusterStats {
        match self.fetch(backend).await {
            Ok(response) => ClusterStats::from_response(backend, response),
            Err(reason) => {
                tracing::warn!(
                    cluster = %backend.name,
                    address = %backend.address,
                    reason = %reason,
                    "Cluster stats poll failed"
                );
                ClusterStats::unhealthy(backend)
            }
        }
    }

    async fn fetch(&self, backend: &BackendDescriptor) -> Result<ClusterStatsResponse, String> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(backend.stats_url())
            .header("user-agent", "query-gateway-monitor")
            .header("accept", "application/json")
            .body(Body::empty())
            .map_err(|e| format!("invalid request: {e}"))?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let response: hyper::Response<hyper::body::Incoming> =
            match time::timeout(timeout, self.client.request(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(format!("connection error: {e}")),
                Err(_) => return Err("timeout".to_string()),
            };

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        let body = Body::new(response.into_body());
        let bytes = match time::timeout(timeout, axum::body::to_bytes(body, MAX_STATS_BODY_BYTES)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(format!("body error: {e}")),
            Err(_) => return Err("timeout reading body".to_string()),
        };

        serde_json::from_slice(&bytes).map_err(|e| format!("malformed stats: {e}"))
    }
}
