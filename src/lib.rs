//! Concurrency-safe structured logging front end.
//!
//! A [`Service`] is shared by every caller. It publishes an immutable
//! [`ActiveLogger`] snapshot, gates new records behind its lifecycle state,
//! counts in-flight records so [`Service::close`] can wait for them, enriches
//! attached errors with their causal chain and can dump arbitrary values.
//!
//! ```no_run
//! use logsvc::prelude::*;
//!
//! let service = Service::new();
//! service.initialize(&LoggingConfig::default())?;
//!
//! service.info_with().str("user", "ada").int("attempt", 2).msg("login");
//! service.close()?;
//! # Ok::<(), logsvc::Error>(())
//! ```

pub mod chain;
pub mod config;
pub mod context;
pub mod dump;
pub mod error;
pub mod event;
pub mod fields;
pub mod level;
pub mod lifecycle;
pub mod logger;
pub mod record;
pub mod service;
pub mod sink;

pub use chain::{analyze, ChainAnalyzer, ErrorChain, OpError, OperationError};
pub use config::{ConfigValidator, LoggingConfig, ValidationError};
pub use context::{LogContext, ScopedLogger};
pub use dump::{Dump, Dumper};
pub use error::{Error, Result};
pub use event::TrackedEvent;
pub use fields::{Dict, Fields};
pub use level::Level;
pub use logger::{ActiveLogger, Hook};
pub use record::Record;
pub use service::{Closer, Logger, Service, ServiceBuilder, State};
pub use sink::{MemorySink, Sink};

/// Everything needed to log through a [`Service`].
pub mod prelude {
    pub use crate::{
        Closer, Dict, Dump, Dumper, Fields, Level, Logger, LoggingConfig, OpError, Service,
    };
}
