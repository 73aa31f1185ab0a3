//! Backend subsystem.
//!
//! # Data Flow
//! ```text
//! config.backends (TOML)
//!     → descriptor.rs (normalize into BackendDescriptor)
//!     → directory.rs (publish snapshot; filter by group / active flag)
//!     → consumed by routing manager, group manager, stats monitor
//!
//! On config reload:
//!     watcher → directory.replace_all → refresh signal → routing snapshot
//! ```
//!
//! # Design Decisions
//! - The core reads descriptors but never mutates them in place
//! - Directory list is swapped wholesale, so readers never see a half-applied reload

pub mod descriptor;
pub mod directory;

pub use descriptor::BackendDescriptor;
pub use directory::{BackendDirectory, InMemoryBackendDirectory};
