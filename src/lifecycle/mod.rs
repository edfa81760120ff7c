//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Resolve working dir → Create log dir
//!         → Build sinks → Build ActiveLogger → Publish → Ready
//!
//! Shutdown (shutdown.rs):
//!     Close → Stop accepting → Wait for in-flight records (bounded)
//!         → Release owned file sink
//! ```
//!
//! # Design Decisions
//! - Ordered startup: nothing is published unless every step succeeded
//! - Ordered shutdown: stop accept, drain, release
//! - Shutdown has timeout: Close returns after the deadline regardless

pub mod shutdown;
pub mod startup;

pub use shutdown::{OpPermit, Quiescence};
