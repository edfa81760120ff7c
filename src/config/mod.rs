//! Logging configuration.
//!
//! # Data Flow
//! ```text
//! logging.toml (flat or under [logging])
//!     → loader.rs (read + serde)
//!     → validation.rs (ConfigValidator, every violation collected)
//!     → LoggingConfig
//!     → Service::initialize
//! ```
//!
//! # Design Decisions
//! - Every field is defaulted, so an empty file is a valid config
//! - The validator is an explicit value owned by the caller, not a global
//! - Initialize re-validates, so a hand-built config gets the same checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config};
pub use schema::LoggingConfig;
pub use validation::{ConfigValidator, ValidationError};
