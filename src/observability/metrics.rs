//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (route decisions, discovery, affinity, cluster load)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_route_decisions_total` (counter): by routing group, outcome
//! - `gateway_discovery_total` (counter): query-id probes by outcome
//! - `gateway_affinity_lookups_total` (counter): by hit/miss
//! - `gateway_affinity_entries` (gauge): cached query-id owners
//! - `gateway_snapshot_backends` / `gateway_snapshot_groups` (gauge)
//! - `gateway_cluster_healthy` (gauge): 1=healthy, 0=unhealthy, per cluster
//! - `gateway_cluster_queued_queries` / `gateway_cluster_running_queries` (gauge)
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: group and cluster names, never query ids

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::stats::ClusterStats;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_route_decision(group: &str, outcome: &'static str) {
    metrics::counter!(
        "gateway_route_decisions_total",
        "group" => group.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_discovery(outcome: &'static str) {
    metrics::counter!("gateway_discovery_total", "outcome" => outcome).increment(1);
}

pub fn record_affinity_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("gateway_affinity_lookups_total", "result" => result).increment(1);
}

pub fn record_affinity_size(entries: usize) {
    metrics::gauge!("gateway_affinity_entries").set(entries as f64);
}

pub fn record_snapshot_refresh(backends: usize, groups: usize) {
    metrics::gauge!("gateway_snapshot_backends").set(backends as f64);
    metrics::gauge!("gateway_snapshot_groups").set(groups as f64);
}

pub fn record_cluster_stats(stats: &ClusterStats) {
    let cluster = stats.cluster_id.clone();
    let group = stats.routing_group.clone();
    metrics::gauge!(
        "gateway_cluster_healthy",
        "cluster" => cluster.clone(),
        "group" => group.clone()
    )
    .set(if stats.healthy { 1.0 } else { 0.0 });
    metrics::gauge!(
        "gateway_cluster_queued_queries",
        "cluster" => cluster.clone(),
        "group" => group.clone()
    )
    .set(stats.queued_query_count as f64);
    metrics::gauge!(
        "gateway_cluster_running_queries",
        "cluster" => cluster,
        "group" => group
    )
    .set(stats.running_query_count as f64);
}
