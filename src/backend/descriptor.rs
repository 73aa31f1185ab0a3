//! Backend descriptor.
//!
//! # Responsibilities
//! - Represent a single configured query-engine cluster
//! - Build the probe and stats URLs the gateway calls on it

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::BackendConfig;

/// Path a cluster serves its load statistics on.
pub const CLUSTER_STATS_PATH: &str = "/v1/cluster";

/// Path prefix a cluster serves per-query status on.
pub const QUERY_STATUS_PATH: &str = "/v1/query";

/// A single backend cluster as published by the backend directory.
///
/// The core only reads descriptors; it never mutates one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendDescriptor {
    /// Unique backend name.
    pub name: String,
    /// Base address requests are proxied to (e.g. `http://presto-1:8080`).
    #[serde(rename = "proxyTo")]
    pub address: String,
    /// Whether the backend takes traffic.
    pub active: bool,
    /// Routing group the backend belongs to.
    pub routing_group: String,
}

impl BackendDescriptor {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        routing_group: impl Into<String>,
        active: bool,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            active,
            routing_group: routing_group.into(),
        }
    }

    /// URL of the cluster stats endpoint.
    pub fn stats_url(&self) -> String {
        format!("{}{}", self.address.trim_end_matches('/'), CLUSTER_STATS_PATH)
    }

    /// URL of the query status endpoint for `query_id`.
    pub fn query_url(&self, query_id: &str) -> Option<String> {
        query_status_url(&self.address, query_id)
    }
}

/// URL of the query status endpoint for `query_id` on the backend at `address`.
///
/// The id is percent-encoded as a single path segment. Ids that cannot name a
/// segment (empty, `.` or `..`) and unparseable addresses yield `None`.
pub fn query_status_url(address: &str, query_id: &str) -> Option<String> {
    if matches!(query_id, "" | "." | "..") {
        return None;
    }

    let mut url = Url::parse(address).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(QUERY_STATUS_PATH.trim_start_matches('/').split('/'))
        .push(query_id);
    Some(url.into())
}

/// Canonical form of an http(s) backend base address.
pub fn normalize_address(address: &str) -> Option<String> {
    let url = Url::parse(address).ok()?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return None;
    }
    Some(url.as_str().trim_end_matches('/').to_string())
}

impl From<&BackendConfig> for BackendDescriptor {
    fn from(config: &BackendConfig) -> Self {
        // Addresses are validated on load; normalize through Url when possible.
        let address =
            normalize_address(&config.address).unwrap_or_else(|| config.address.clone());
        Self {
            name: config.name.clone(),
            address,
            active: config.active,
            routing_group: config.routing_group.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let b = BackendDescriptor::new("p1", "http://presto-1:8080/", "adhoc", true);
        assert_eq!(b.stats_url(), "http://presto-1:8080/v1/cluster");
        assert_eq!(
            b.query_url("20240101_abc").as_deref(),
            Some("http://presto-1:8080/v1/query/20240101_abc")
        );
    }

    #[test]
    fn test_query_id_stays_in_one_segment() {
        let url = query_status_url("http://presto-1:8080", "../cluster");
        assert_eq!(url.as_deref(), Some("http://presto-1:8080/v1/query/..%2Fcluster"));

        let url = query_status_url("http://presto-1:8080/", "a?b#c");
        assert_eq!(url.as_deref(), Some("http://presto-1:8080/v1/query/a%3Fb%23c"));

        let url = query_status_url("http://gw/presto-1", "q1");
        assert_eq!(url.as_deref(), Some("http://gw/presto-1/v1/query/q1"));
    }

    #[test]
    fn test_dot_segments_have_no_status_url() {
        assert_eq!(query_status_url("http://presto-1:8080", ".."), None);
        assert_eq!(query_status_url("http://presto-1:8080", "."), None);
        assert_eq!(query_status_url("http://presto-1:8080", ""), None);
        assert_eq!(query_status_url("not a url", "q1"), None);
    }

    #[test]
    fn test_from_config_normalizes_address() {
        let config = BackendConfig {
            name: "p1".into(),
            routing_group: "etl".into(),
            address: "http://presto-1:8080".into(),
            active: false,
        };
        let b = BackendDescriptor::from(&config);
        assert_eq!(b.address, "http://presto-1:8080");
        assert_eq!(b.routing_group, "etl");
        assert!(!b.active);
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("HTTP://Presto-1:8080/").as_deref(),
            Some("http://presto-1:8080")
        );
        assert_eq!(normalize_address("presto-1:8080"), None);
        assert_eq!(normalize_address("mailto:ops@example.com"), None);
        assert_eq!(normalize_address("ftp://presto-1/"), None);
    }

    #[test]
    fn test_serializes_proxy_to() {
        let b = BackendDescriptor::new("p1", "http://presto-1:8080", "adhoc", true);
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["proxyTo"], "http://presto-1:8080");
        assert_eq!(json["routingGroup"], "adhoc");
    }
}
