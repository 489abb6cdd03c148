//! TTX Store - reference session stores
//!
//! Provides:
//! - [`MemorySessionStore`]: concurrent in-process map
//! - [`FileSessionStore`]: one JSON snapshot per session on disk, with a
//!   read cache, listing, deletion and age-based pruning
//!
//! Both implement [`ttx_engine::SessionStore`].

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod file;
pub mod memory;

pub use file::{FileSessionStore, SessionSummary, DEFAULT_MAX_SESSIONS};
pub use memory::MemorySessionStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
