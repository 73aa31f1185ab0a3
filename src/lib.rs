//! High-availability query gateway: routing core.
//!
//! Fronts a fleet of query-engine clusters and decides which cluster each
//! request goes to.

pub mod admin;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod groups;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use error::{RoutingError, RoutingResult};
pub use gateway::Gateway;
pub use lifecycle::Shutdown;
