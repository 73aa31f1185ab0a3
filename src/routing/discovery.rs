//! Unknown-query discovery.
//!
//! # Responsibilities
//! - Ask every known backend whether it is running a given query id
//! - Return the first backend that confirms, abandoning the other probes
//! - Bound outbound probes with a shared permit pool and an overall deadline
//!
//! # Design Decisions
//! - Probes race through `FuturesUnordered`; results are consumed as they complete
//! - Dropping the race cancels probes still in flight
//! - Each probe has its own connect/read timeout; the round has a separate deadline

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use futures_util::stream::{FuturesUnordered, StreamExt};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::Semaphore;
use tokio::time;

use crate::backend::descriptor::query_status_url;
use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use crate::observability::metrics;

/// Existence check for a query on one backend.
#[async_trait]
pub trait QueryProber: Send + Sync {
    /// True when the backend at `address` reports it knows `query_id`.
    async fn probe(&self, address: &str, query_id: &str) -> bool;
}

/// Probes `HEAD {address}/v1/query/{id}`; only 200 counts as found.
pub struct HttpQueryProber {
    client: Client<HttpConnector, Body>,
    read_timeout: Duration,
}

impl HttpQueryProber {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            read_timeout,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.read_timeout_ms),
        )
    }
}

#[async_trait]
impl QueryProber for HttpQueryProber {
    async fn probe(&self, address: &str, query_id: &str) -> bool {
        let Some(url) = query_status_url(address, query_id) else {
            tracing::debug!(address = %address, query_id = %query_id, "No status URL for query id");
            return false;
        };
        let request = match Request::builder()
            .method(Method::HEAD)
            .uri(url)
            .header("user-agent", "query-gateway-discovery")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Failed to build discovery probe");
                return false;
            }
        };

        match time::timeout(self.read_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response.status() == StatusCode::OK,
            Ok(Err(e)) => {
                tracing::debug!(address = %address, error = %e, "Discovery probe failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(address = %address, "Discovery probe failed: timeout");
                false
            }
        }
    }
}

/// Races probes against a set of backends.
pub struct Discovery {
    prober: Arc<dyn QueryProber>,
    permits: Arc<Semaphore>,
    deadline: Duration,
}

impl Discovery {
    pub fn new(prober: Arc<dyn QueryProber>, max_concurrent_probes: usize, deadline: Duration) -> Self {
        Self {
            prober,
            permits: Arc::new(Semaphore::new(max_concurrent_probes.max(1))),
            deadline,
        }
    }

    /// First address in `addresses` that confirms `query_id`.
    pub async fn discover(
        &self,
        query_id: &str,
        addresses: Vec<String>,
    ) -> Result<String, DiscoveryError> {
        if addresses.is_empty() {
            return Err(DiscoveryError::Failed);
        }

        let race = async {
            let mut probes = FuturesUnordered::new();
            for address in addresses {
                let prober = self.prober.clone();
                let permits = self.permits.clone();
                probes.push(async move {
                    let _permit = permits.acquire_owned().await.ok()?;
                    let found = prober.probe(&address, query_id).await;
                    found.then_some(address)
                });
            }

            while let Some(result) = probes.next().await {
                if let Some(address) = result {
                    return Ok(address);
                }
            }
            Err(DiscoveryError::Failed)
        };

        let outcome = match time::timeout(self.deadline, race).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DiscoveryError::Timeout),
        };

        match &outcome {
            Ok(address) => {
                tracing::info!(query_id = %query_id, backend = %address, "Found query on backend");
                metrics::record_discovery("found");
            }
            Err(DiscoveryError::Timeout) => {
                tracing::warn!(query_id = %query_id, deadline = ?self.deadline, "Query discovery timed out");
                metrics::record_discovery("timeout");
            }
            Err(DiscoveryError::Failed) => {
                tracing::warn!(query_id = %query_id, "Query id not found on any backend");
                metrics::record_discovery("not_found");
            }
        }
        outcome
    }
}
