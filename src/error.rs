//! Gateway error types.

use thiserror::Error;

/// Errors raised by a routing-group store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("routing group already exists: {0}")]
    Duplicate(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by a backend directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("backend not found: {0}")]
    BackendNotFound(String),

    #[error("backend already exists: {0}")]
    DuplicateBackend(String),

    #[error("invalid backend address: {0}")]
    InvalidAddress(String),
}

/// Errors surfaced by routing and routing-group operations.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no active backends available in routing group {0}")]
    NoBackendsAvailable(String),

    #[error("routing group {0} is paused")]
    GroupPaused(String),

    #[error("routing group not found: {0}")]
    GroupNotFound(String),

    #[error("routing group already exists: {0}")]
    DuplicateGroup(String),

    #[error("no backend found for query {0}")]
    QueryNotFound(String),

    #[error("not a known backend address: {0}")]
    UnknownBackendAddress(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<StoreError> for RoutingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(name) => RoutingError::DuplicateGroup(name),
            other => RoutingError::Store(other),
        }
    }
}

/// Outcome of a discovery round that produced no confirmed owner.
///
/// Never surfaced to callers; the routing manager recovers with an uncached
/// adhoc guess.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("discovery deadline elapsed")]
    Timeout,

    #[error("no backend confirmed the query")]
    Failed,
}

pub type RoutingResult<T> = Result<T, RoutingError>;
