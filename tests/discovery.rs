//! Query-id discovery against real HTTP mock clusters.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use query_gateway::backend::{BackendDescriptor, InMemoryBackendDirectory};
use query_gateway::config::{AffinityCacheConfig, DiscoveryConfig};
use query_gateway::error::RoutingError;
use query_gateway::routing::RoutingManager;

mod common;

fn manager(backends: Vec<BackendDescriptor>, deadline_ms: u64) -> RoutingManager {
    let directory = Arc::new(InMemoryBackendDirectory::new(backends.clone()));
    let discovery = DiscoveryConfig {
        connect_timeout_ms: 500,
        read_timeout_ms: 2000,
        deadline_ms,
        max_concurrent_probes: 5,
    };
    let manager =
        RoutingManager::with_http_prober(directory, &discovery, &AffinityCacheConfig::default());
    manager.update_backend_proxy_map(&backends);
    manager
}

#[tokio::test]
async fn test_owner_found_and_cached() {
    let adhoc = common::start_mock_cluster(&[], 0).await;
    let etl = common::start_mock_cluster(&["20240101_000001_abcde"], 0).await;

    let manager = manager(
        vec![
            BackendDescriptor::new("a1", adhoc.clone(), "adhoc", true),
            BackendDescriptor::new("e1", etl.clone(), "etl", true),
        ],
        5_000,
    );

    let owner = manager.find_backend_for_query_id("20240101_000001_abcde").await.unwrap();
    assert_eq!(owner, etl);

    // Second lookup is served from the affinity cache
    let again = manager.find_backend_for_query_id("20240101_000001_abcde").await.unwrap();
    assert_eq!(again, etl);
}

#[tokio::test]
async fn test_unknown_query_falls_back_to_adhoc_uncached() {
    let probes = Arc::new(AtomicU32::new(0));
    let p = probes.clone();
    let adhoc = common::start_programmable_backend(move |req| {
        let p = p.clone();
        async move {
            if req.method == "HEAD" {
                p.fetch_add(1, Ordering::SeqCst);
            }
            (404, String::new())
        }
    })
    .await;

    let manager = manager(vec![BackendDescriptor::new("a1", adhoc.clone(), "adhoc", true)], 5_000);

    assert_eq!(manager.find_backend_for_query_id("q-missing").await.unwrap(), adhoc);
    assert_eq!(manager.find_backend_for_query_id("q-missing").await.unwrap(), adhoc);

    // The guess was not cached, so both lookups probed again
    assert_eq!(probes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_slow_backend_bounded_by_deadline() {
    let slow = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, String::new())
    })
    .await;
    let adhoc = common::start_mock_cluster(&[], 0).await;

    let manager = manager(
        vec![
            BackendDescriptor::new("a1", adhoc.clone(), "adhoc", true),
            BackendDescriptor::new("s1", slow, "etl", true),
        ],
        300,
    );

    let started = Instant::now();
    let owner = manager.find_backend_for_query_id("q-slow").await.unwrap();
    assert_eq!(owner, adhoc);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_no_adhoc_backend_reports_query_not_found() {
    let etl = common::start_mock_cluster(&[], 0).await;
    let manager = manager(vec![BackendDescriptor::new("e1", etl, "etl", true)], 5_000);

    let result = manager.find_backend_for_query_id("q-nowhere").await;
    assert!(matches!(result, Err(RoutingError::QueryNotFound(id)) if id == "q-nowhere"));
}

#[tokio::test]
async fn test_query_id_cannot_escape_status_path() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    // Answers 200 on any path outside /v1/query/, like a server that resolves dot segments.
    let etl = common::start_programmable_backend(move |req| {
        let recorded = recorded.clone();
        async move {
            recorded.lock().unwrap().push(req.path.clone());
            if req.path.starts_with("/v1/query/") && !req.path.contains("/../") {
                (404, String::new())
            } else {
                (200, String::new())
            }
        }
    })
    .await;
    let adhoc = common::start_mock_cluster(&[], 0).await;

    let manager = manager(
        vec![
            BackendDescriptor::new("a1", adhoc.clone(), "adhoc", true),
            BackendDescriptor::new("e1", etl, "etl", true),
        ],
        5_000,
    );

    let owner = manager.find_backend_for_query_id("../cluster").await.unwrap();
    assert_eq!(owner, adhoc);
    assert_eq!(*seen.lock().unwrap(), vec!["/v1/query/..%2Fcluster".to_string()]);
}
