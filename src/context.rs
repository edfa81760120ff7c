//! Context loggers: a fixed set of fields prepended to every record.

use std::error::Error as StdError;
use std::panic::Location;
use std::sync::Arc;

use serde_json::Value;

use crate::event::TrackedEvent;
use crate::fields::{error_fields, Fields, Key};
use crate::level::Level;
use crate::service::{Logger, Service};

/// Builder returned by [`Service::with`] and [`ScopedLogger::with`].
#[derive(Debug, Clone)]
#[must_use = "call logger() to obtain the scoped logger"]
pub struct LogContext {
    service: Service,
    fields: Vec<(Key, Value)>,
}

impl LogContext {
    pub(crate) fn new(service: Service, fields: Vec<(Key, Value)>) -> Self {
        Self { service, fields }
    }

    /// Freeze the accumulated fields into a logger.
    pub fn logger(self) -> ScopedLogger {
        ScopedLogger {
            service: self.service,
            fields: self.fields.into(),
        }
    }
}

impl Fields for LogContext {
    fn put(mut self, key: impl Into<Key>, value: impl FnOnce() -> Value) -> Self {
        self.fields.push((key.into(), value()));
        self
    }

    /// Same chain fields as a record-level error, using the service's analyzer.
    fn an_err(mut self, key: impl Into<Key>, err: &(dyn StdError + 'static)) -> Self {
        let fields = error_fields(key.into(), err, self.service.analyzer());
        self.fields.extend(fields);
        self
    }
}

/// Child logger sharing its service's gate, counter and current snapshot.
///
/// Cheap to clone. Closing the service silences every scoped logger derived
/// from it.
#[derive(Debug, Clone)]
pub struct ScopedLogger {
    service: Service,
    fields: Arc<[(Key, Value)]>,
}

impl ScopedLogger {
    /// Extend this scope with more fields.
    pub fn with(&self) -> LogContext {
        LogContext::new(self.service.clone(), self.fields.to_vec())
    }

    pub fn service(&self) -> &Service {
        &self.service
    }
}

impl Logger for ScopedLogger {
    fn begin(&self, level: Level, caller: &'static Location<'static>) -> TrackedEvent {
        self.service
            .begin(level, caller)
            .extend(self.fields.iter().cloned())
    }
}
