//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Adhoc / routing-group request
//!     → manager.rs (active backends from directory, pause flag from snapshot.rs)
//!     → uniform random pick, or adhoc fallback
//!
//! Follow-up request for query id
//!     → affinity.rs (sliding-TTL cache)
//!     → on miss: discovery.rs (race HEAD probes across known backends)
//!     → confirmed owner cached; otherwise uncached adhoc guess
//!
//! Refresh (periodic tick or group change):
//!     refresh.rs → directory + group manager → snapshot.rs swap
//!
//! Stats tick:
//!     health::queue_length observer → queue_length.rs swap
//! ```
//!
//! # Design Decisions
//! - Snapshot maps are swapped whole; readers never see a half-built map
//! - Selection failures are explicit errors, never a silently wrong backend

pub mod affinity;
pub mod discovery;
pub mod manager;
pub mod queue_length;
pub mod refresh;
pub mod snapshot;

/// Default routing group.
pub const ADHOC: &str = "adhoc";

pub use manager::RoutingManager;
pub use queue_length::QueueLengthRoutingTable;
pub use refresh::SnapshotRefresher;
