//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → watcher.rs diffs against the last accepted config (ConfigReload)
//!     → backend directory replaced, new routing groups seeded, snapshot refreshed
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Backends and routing-group seeds are hot-reloaded; other sections are
//!   reported as needing a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AffinityCacheConfig, BackendConfig, DiscoveryConfig, GatewayConfig, ListenerConfig,
    MonitorConfig, ObservabilityConfig, RefreshConfig, RoutingGroupConfig, StoreConfig,
};
pub use watcher::{ConfigReload, ConfigWatcher};
