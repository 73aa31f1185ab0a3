//! Live routing snapshot.
//!
//! # Responsibilities
//! - Hold routing-group active flags and backend addresses for request threads
//! - Replace maps as a whole, never mutating one in place
//!
//! # Design Decisions
//! - Readers load an `Arc<RoutingSnapshot>` without locking
//! - A refresh builds both maps first and publishes them in one swap, so a
//!   reader never pairs maps from different refreshes
//! - A group missing from the active map counts as active

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::backend::BackendDescriptor;
use crate::groups::RoutingGroupRecord;

/// Immutable view of routing state at one refresh generation.
#[derive(Debug, Clone, Default)]
pub struct RoutingSnapshot {
    group_active: Arc<HashMap<String, bool>>,
    backend_address: Arc<HashMap<String, String>>,
}

impl RoutingSnapshot {
    /// Whether requests may be routed to `group`.
    pub fn is_group_active(&self, group: &str) -> bool {
        self.group_active.get(group).copied().unwrap_or(true)
    }

    pub fn group_active(&self) -> &HashMap<String, bool> {
        &self.group_active
    }

    /// Backend name to base address.
    pub fn backend_addresses(&self) -> &HashMap<String, String> {
        &self.backend_address
    }
}

/// Owner of the current [`RoutingSnapshot`].
#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: ArcSwap<RoutingSnapshot>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<RoutingSnapshot> {
        self.current.load_full()
    }

    /// Publish both maps from one refresh generation in a single swap.
    pub fn replace(&self, backends: &[BackendDescriptor], groups: &[RoutingGroupRecord]) {
        self.current.store(Arc::new(RoutingSnapshot {
            group_active: group_active_map(groups),
            backend_address: backend_address_map(backends),
        }));
    }

    /// Replace the group-active map.
    pub fn replace_groups(&self, groups: &[RoutingGroupRecord]) {
        let group_active = group_active_map(groups);
        self.current.rcu(|current| RoutingSnapshot {
            group_active: group_active.clone(),
            backend_address: current.backend_address.clone(),
        });
    }

    /// Replace the backend-address map.
    pub fn replace_backends(&self, backends: &[BackendDescriptor]) {
        let backend_address = backend_address_map(backends);
        self.current.rcu(|current| RoutingSnapshot {
            group_active: current.group_active.clone(),
            backend_address: backend_address.clone(),
        });
    }
}

fn group_active_map(groups: &[RoutingGroupRecord]) -> Arc<HashMap<String, bool>> {
    Arc::new(groups.iter().map(|g| (g.name.clone(), g.active)).collect())
}

fn backend_address_map(backends: &[BackendDescriptor]) -> Arc<HashMap<String, String>> {
    Arc::new(
        backends
            .iter()
            .map(|b| (b.name.clone(), b.address.clone()))
            .collect(),
    )
}
