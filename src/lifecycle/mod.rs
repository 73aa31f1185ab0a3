//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Directory + group store → Routing manager → First snapshot
//!     → Spawn refresher, stats monitor, config reload
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop admin listener → Stop background loops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Shutdown has timeout: loops still running after the grace period are abandoned

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{start, GatewayRuntime, StartupError};
