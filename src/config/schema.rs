//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::ADHOC;

/// Root configuration for the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Admin API listener.
    pub listener: ListenerConfig,

    /// Backend cluster definitions.
    pub backends: Vec<BackendConfig>,

    /// Routing groups seeded into the store at startup if absent.
    pub routing_groups: Vec<RoutingGroupConfig>,

    /// Cluster stats polling.
    pub monitor: MonitorConfig,

    /// Unknown-query discovery.
    pub discovery: DiscoveryConfig,

    /// Query-affinity cache.
    pub affinity_cache: AffinityCacheConfig,

    /// Routing snapshot refresh.
    pub refresh: RefreshConfig,

    /// Routing-group store.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration for the admin API.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Admin request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Backend cluster configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier.
    pub name: String,

    /// Routing group this cluster belongs to.
    #[serde(default = "default_routing_group")]
    pub routing_group: String,

    /// Base URL of the cluster (e.g., "http://presto-1:8080").
    pub address: String,

    /// Whether the backend takes traffic.
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Routing group seed entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoutingGroupConfig {
    pub name: String,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_routing_group() -> String {
    ADHOC.to_string()
}

fn default_active() -> bool {
    true
}

/// Cluster stats polling configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Enable stats polling.
    pub enabled: bool,

    /// Poll interval in seconds.
    pub interval_secs: u64,

    /// Per-backend poll timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 5,
        }
    }
}

/// Unknown-query discovery configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Probe connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Probe read timeout in milliseconds.
    pub read_timeout_ms: u64,

    /// Upper bound for a whole discovery round in milliseconds.
    pub deadline_ms: u64,

    /// Maximum probes in flight across all discovery rounds.
    pub max_concurrent_probes: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            read_timeout_ms: 5_000,
            deadline_ms: 10_000,
            max_concurrent_probes: 5,
        }
    }
}

/// Query-affinity cache configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AffinityCacheConfig {
    /// Maximum number of cached query ids.
    pub capacity: usize,

    /// Idle time after which an entry expires, in seconds.
    pub idle_ttl_secs: u64,
}

impl Default for AffinityCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            idle_ttl_secs: 30 * 60,
        }
    }
}

/// Routing snapshot refresh configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Periodic refresh interval in seconds.
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

/// Routing-group store configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file the store is persisted to. In-memory only when unset.
    pub persistence_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[backends]]
            name = "presto-1"
            address = "http://presto-1:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.backends[0].routing_group, "adhoc");
        assert!(config.backends[0].active);
        assert_eq!(config.affinity_cache.capacity, 10_000);
        assert_eq!(config.affinity_cache.idle_ttl_secs, 1800);
        assert_eq!(config.discovery.max_concurrent_probes, 5);
        assert_eq!(config.discovery.connect_timeout_ms, 5_000);
        assert!(config.store.persistence_path.is_none());
    }

    #[test]
    fn test_full_config() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [[backends]]
            name = "etl-1"
            routing_group = "etl"
            address = "http://etl-1:8080"
            active = false

            [[routing_groups]]
            name = "etl"
            active = false

            [monitor]
            interval_secs = 3

            [refresh]
            interval_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert!(!config.backends[0].active);
        assert!(!config.routing_groups[0].active);
        assert_eq!(config.monitor.interval_secs, 3);
        assert_eq!(config.monitor.timeout_secs, 5);
        assert_eq!(config.refresh.interval_secs, 5);
    }
}
