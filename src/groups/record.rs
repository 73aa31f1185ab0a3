//! Routing group record.

use serde::{Deserialize, Serialize};

use crate::backend::BackendDescriptor;

/// A routing group as seen by callers.
///
/// `active` comes from the routing-group store. The two counters are derived from
/// the backend topology on every read and are never the persisted source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingGroupRecord {
    pub name: String,
    pub active: bool,
    #[serde(default)]
    pub number_of_clusters: u32,
    #[serde(default)]
    pub active_clusters: u32,
}

impl RoutingGroupRecord {
    /// A record with an explicit active flag and zero counters.
    pub fn new(name: impl Into<String>, active: bool) -> Self {
        Self {
            name: name.into(),
            active,
            number_of_clusters: 0,
            active_clusters: 0,
        }
    }

    /// A record for a group known only by name. Defaults to active.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    /// Count a backend towards this group's derived counters.
    pub fn register_backend(&mut self, backend: &BackendDescriptor) {
        if backend.active {
            self.active_clusters += 1;
        }
        self.number_of_clusters += 1;
    }

    /// Same record with derived counters cleared, as it is persisted.
    pub fn persisted(&self) -> Self {
        Self::new(self.name.clone(), self.active)
    }
}
