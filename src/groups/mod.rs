//! Routing group subsystem.
//!
//! # Data Flow
//! ```text
//! Backend directory snapshot ──┐
//!                              ├─→ manager.rs (read-time merge) → Vec<RoutingGroupRecord>
//! store.rs (persisted groups) ─┘
//!
//! pause / resume / add / update / delete
//!     → store.rs
//!     → refresh signal → routing snapshot refresher
//! ```

pub mod manager;
pub mod record;
pub mod store;

pub use manager::{get_by_name, is_routing_group_active, RoutingGroupManager};
pub use record::RoutingGroupRecord;
pub use store::{InMemoryRoutingGroupStore, RoutingGroupStore};
