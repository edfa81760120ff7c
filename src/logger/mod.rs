//! Logger snapshot and its hot-swap handle.
//!
//! # Data Flow
//! ```text
//! Initialize → ActiveLogger (level, sinks, timestamp/caller policy)
//!     → LoggerHandle::publish
//!
//! begin-operation → LoggerHandle::load (lock-free)
//! hook()          → load → derive(with_hook) → compare_and_swap, retry on race
//! Close           → LoggerHandle::take
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; an old one stays valid for whoever still holds it
//! - Readers never block writers and vice versa

pub mod active;
pub mod handle;

pub use active::{ActiveLogger, Hook};
pub use handle::LoggerHandle;
