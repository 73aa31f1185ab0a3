//! Cluster health and load subsystem.
//!
//! # Data Flow
//! ```text
//! Stats monitor (monitor.rs):
//!     Periodic timer
//!     → GET /v1/cluster on every active backend (concurrently)
//!     → ClusterStats per backend (stats.rs), unhealthy on any failure
//!     → observer.rs chain, in registration order
//!
//! Queue-length observer (queue_length.rs):
//!     → routing::queue_length table swap
//! ```
//!
//! # Design Decisions
//! - A failed poll still yields a record, so observers see every active cluster
//! - One failing observer never blocks the others

pub mod monitor;
pub mod observer;
pub mod queue_length;
pub mod stats;

pub use monitor::ClusterStatsMonitor;
pub use observer::{ObserverChain, ObserverError};
pub use queue_length::QueueLengthObserver;
pub use stats::ClusterStats;
