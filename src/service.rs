//! Logging service lifecycle.
//!
//! # Responsibilities
//! - One-shot, all-or-nothing Initialize that publishes the first snapshot
//! - Gated begin-operation: no record can start after Close has flipped state
//! - Quiescence tracking and bounded-wait Close
//! - Hook attachment by compare-and-swap on the published snapshot
//!
//! # Data Flow
//! ```text
//! begin(level):
//!     state Ready? ──no──▶ inert builder
//!        │yes
//!     acquire permit → gate.read() → state Ready? → load snapshot → level on?
//!        │                                   └──no──▶ drop permit, inert builder
//!     release gate → TrackedEvent { record, snapshot, permit }
//!
//! close():
//!     gate.write() → Ready→Closed, take snapshot → release gate
//!     → wait_idle(timeout) → [timed out] warning via captured snapshot
//!     → gate.write() → take owned sinks → close each, report the first failure
//! ```
//!
//! # Design Decisions
//! - The gate is held in shared mode only for the check-and-load step, never
//!   across a caller's field chain
//! - A permit is taken before the gate so Close, once it owns the gate, sees
//!   every operation that can still commit
//! - Owned sinks (the file sink plus any handed over with
//!   `with_owned_sink`) live inside the gate, so Initialize and Close are
//!   the only writers of them

use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

use crate::chain::ChainAnalyzer;
use crate::config::{ConfigValidator, LoggingConfig};
use crate::context::LogContext;
use crate::dump::{Dump, Dumper};
use crate::error::{Error, Result};
use crate::event::TrackedEvent;
use crate::level::Level;
use crate::lifecycle::{startup, OpPermit, Quiescence};
use crate::logger::{ActiveLogger, Hook, LoggerHandle};
use crate::sink::Sink;

const UNINITIALIZED: u8 = 0;
const READY: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle state of a [`Service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Ready,
    Closed,
}

/// Common producer surface.
///
/// Implemented by [`Service`], [`ScopedLogger`](crate::ScopedLogger) and
/// `Option<L>`, where `None` behaves as a logger that was never initialized.
pub trait Logger {
    /// Open a record at `level`, attributed to `caller`.
    fn begin(&self, level: Level, caller: &'static Location<'static>) -> TrackedEvent;

    #[track_caller]
    fn trace_with(&self) -> TrackedEvent {
        self.begin(Level::Trace, Location::caller())
    }

    #[track_caller]
    fn debug_with(&self) -> TrackedEvent {
        self.begin(Level::Debug, Location::caller())
    }

    #[track_caller]
    fn info_with(&self) -> TrackedEvent {
        self.begin(Level::Info, Location::caller())
    }

    #[track_caller]
    fn warn_with(&self) -> TrackedEvent {
        self.begin(Level::Warn, Location::caller())
    }

    #[track_caller]
    fn error_with(&self) -> TrackedEvent {
        self.begin(Level::Error, Location::caller())
    }

    /// Commits, flushes and exits the process with status 1.
    #[track_caller]
    fn fatal_with(&self) -> TrackedEvent {
        self.begin(Level::Fatal, Location::caller())
    }

    /// Commits, then panics with the message.
    #[track_caller]
    fn panic_with(&self) -> TrackedEvent {
        self.begin(Level::Panic, Location::caller())
    }
}

impl<L: Logger> Logger for Option<L> {
    fn begin(&self, level: Level, caller: &'static Location<'static>) -> TrackedEvent {
        match self {
            Some(logger) => logger.begin(level, caller),
            None => TrackedEvent::disabled(),
        }
    }
}

/// Resources that can be released more than once.
pub trait Closer {
    fn close(&self) -> Result<()>;
}

impl<C: Closer> Closer for Option<C> {
    fn close(&self) -> Result<()> {
        match self {
            Some(closer) => closer.close(),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ClosePolicy {
    timeout: Duration,
    warn_on_timeout: bool,
}

impl Default for ClosePolicy {
    fn default() -> Self {
        Self {
            timeout: LoggingConfig::default().shutdown_timeout(),
            warn_on_timeout: false,
        }
    }
}

struct Inner {
    state: AtomicU8,
    /// Held shared by begin-operations, exclusively by Initialize and Close.
    gate: RwLock<Vec<Arc<dyn Sink>>>,
    handle: LoggerHandle,
    ops: Arc<Quiescence>,
    init: OnceLock<Result<()>>,
    policy: OnceLock<ClosePolicy>,
    working_dir: Option<PathBuf>,
    validator: ConfigValidator,
    analyzer: Arc<ChainAnalyzer>,
    extra_sinks: Vec<Arc<dyn Sink>>,
    owned_sinks: Vec<Arc<dyn Sink>>,
}

/// Shared logging service. Clones are handles to the same service.
#[derive(Clone)]
pub struct Service {
    inner: Arc<Inner>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("state", &self.state())
            .field("active_operations", &self.active_operations())
            .finish()
    }
}

impl Default for Service {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for a [`Service`] with non-default collaborators.
#[derive(Default)]
pub struct ServiceBuilder {
    working_dir: Option<PathBuf>,
    validator: Option<ConfigValidator>,
    analyzer: Option<Arc<ChainAnalyzer>>,
    extra_sinks: Vec<Arc<dyn Sink>>,
    owned_sinks: Vec<Arc<dyn Sink>>,
}

impl ServiceBuilder {
    /// Base directory for the relative log directory. Defaults to the
    /// process's current directory at Initialize.
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_validator(mut self, validator: ConfigValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_analyzer(mut self, analyzer: ChainAnalyzer) -> Self {
        self.analyzer = Some(Arc::new(analyzer));
        self
    }

    /// Sink written to in addition to the configured ones.
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.extra_sinks.push(sink);
        self
    }

    /// Sink the service writes to and also closes on Close. A close
    /// failure is reported as [`Error::CloseSink`].
    pub fn with_owned_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.owned_sinks.push(sink);
        self
    }

    pub fn build(self) -> Service {
        Service {
            inner: Arc::new(Inner {
                state: AtomicU8::new(UNINITIALIZED),
                gate: RwLock::new(Vec::new()),
                handle: LoggerHandle::new(),
                ops: Arc::new(Quiescence::new()),
                init: OnceLock::new(),
                policy: OnceLock::new(),
                working_dir: self.working_dir,
                validator: self.validator.unwrap_or_default(),
                analyzer: self.analyzer.unwrap_or_default(),
                extra_sinks: self.extra_sinks,
                owned_sinks: self.owned_sinks,
            }),
        }
    }
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }

    pub fn state(&self) -> State {
        match self.inner.state.load(Ordering::Acquire) {
            READY => State::Ready,
            CLOSED => State::Closed,
            _ => State::Uninitialized,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == READY
    }

    /// Operations begun and not yet committed or dropped.
    pub fn active_operations(&self) -> usize {
        self.inner.ops.active()
    }

    pub(crate) fn analyzer(&self) -> &ChainAnalyzer {
        &self.inner.analyzer
    }

    /// Validate `config`, build the sinks and publish the first snapshot.
    ///
    /// Runs once. Every call, concurrent or later, returns the outcome of the
    /// first attempt. On failure nothing is published and the service stays
    /// uninitialized for good.
    pub fn initialize(&self, config: &LoggingConfig) -> Result<()> {
        self.inner
            .init
            .get_or_init(|| self.try_initialize(config))
            .clone()
    }

    fn try_initialize(&self, config: &LoggingConfig) -> Result<()> {
        let inner = &self.inner;
        inner.validator.validate(config).map_err(Error::Config)?;

        let working_dir = startup::resolve_working_dir(inner.working_dir.as_deref())?;
        let log_dir = working_dir.join(&config.rel_log_file_dir);
        startup::ensure_dir(&log_dir)?;

        let mut set = startup::build_sinks(config, &log_dir)?;
        set.sinks.extend(inner.extra_sinks.iter().cloned());
        set.sinks.extend(inner.owned_sinks.iter().cloned());
        let mut owned: Vec<Arc<dyn Sink>> = Vec::new();
        if let Some(file) = set.file {
            owned.push(file);
        }
        owned.extend(inner.owned_sinks.iter().cloned());
        let logger = startup::build_logger(config, set.sinks, inner.analyzer.clone())?;

        let _ = inner.policy.set(ClosePolicy {
            timeout: config.shutdown_timeout(),
            warn_on_timeout: config.shutdown_timeout_warning,
        });

        let mut gate = inner.gate.write().unwrap_or_else(PoisonError::into_inner);
        *gate = owned;
        inner.handle.publish(Arc::new(logger));
        inner.state.store(READY, Ordering::Release);
        drop(gate);

        tracing::info!(
            level = %config.level,
            log_dir = %log_dir.display(),
            console = config.console_logging,
            file = config.file_sink_enabled(),
            "Logging service initialized"
        );
        Ok(())
    }

    /// Stop accepting records, wait (bounded) for in-flight ones and release
    /// the owned sinks.
    ///
    /// Safe on an uninitialized or already closed service. Only a failure to
    /// close an owned sink is reported; every owned sink is still closed.
    #[track_caller]
    pub fn close(&self) -> Result<()> {
        let inner = &self.inner;
        let caller = Location::caller();

        let last = {
            let _gate = inner.gate.write().unwrap_or_else(PoisonError::into_inner);
            if inner
                .state
                .compare_exchange(READY, CLOSED, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Ok(());
            }
            inner.handle.take()
        };

        let policy = inner.policy.get().copied().unwrap_or_default();
        let started = Instant::now();
        if inner.ops.wait_idle(policy.timeout) {
            tracing::debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "In-flight log operations drained"
            );
        } else {
            let active = inner.ops.active();
            let timeout_ms = policy.timeout.as_millis() as u64;
            tracing::warn!(
                active_operations = active,
                timeout_ms,
                "Timed out waiting for in-flight log operations"
            );
            if policy.warn_on_timeout {
                if let Some(logger) = last.as_deref() {
                    emit_timeout_warning(logger, caller, active, timeout_ms);
                }
            }
        }

        let owned = {
            let mut gate = inner.gate.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *gate)
        };
        let mut failure = None;
        for sink in owned {
            if let Err(e) = sink.close() {
                tracing::warn!(error = %e, "Failed to close log sink");
                failure.get_or_insert(e);
            }
        }
        if let Some(e) = failure {
            return Err(Error::CloseSink(Arc::new(e)));
        }

        tracing::info!("Logging service closed");
        Ok(())
    }

    /// Gated entry shared by every producer call.
    fn enter(&self, level: Level) -> Option<(Arc<ActiveLogger>, OpPermit)> {
        let inner = &self.inner;
        if !self.is_ready() {
            return None;
        }
        let permit = inner.ops.acquire();
        let _gate = inner.gate.read().unwrap_or_else(PoisonError::into_inner);
        if !self.is_ready() {
            return None;
        }
        let logger = inner.handle.load()?;
        if !logger.enabled(level) {
            return None;
        }
        Some((logger, permit))
    }

    /// Open a record at `level`. See [`Logger`] for the per-level shorthands.
    pub fn begin(&self, level: Level, caller: &'static Location<'static>) -> TrackedEvent {
        match self.enter(level) {
            Some((logger, permit)) => TrackedEvent::open(logger, level, caller, Some(permit)),
            None => TrackedEvent::disabled(),
        }
    }

    /// Attach `hook` to the published snapshot.
    ///
    /// Concurrent calls all land. Returns `false` if nothing is published.
    pub fn hook(&self, hook: impl Hook) -> bool {
        let hook: Arc<dyn Hook> = Arc::new(hook);
        self.inner.handle.update(|current| current.with_hook(hook.clone()))
    }

    /// Start a context whose fields are prepended to every record of the
    /// resulting [`ScopedLogger`](crate::ScopedLogger).
    pub fn with(&self) -> LogContext {
        LogContext::new(self.clone(), Vec::new())
    }

    /// Describe `value` as a series of debug records.
    ///
    /// Counted as one in-flight operation for the whole walk.
    #[track_caller]
    pub fn dump<T: Dump + ?Sized>(&self, value: &T) {
        let caller = Location::caller();
        let Some((logger, _permit)) = self.enter(Level::Debug) else {
            return;
        };
        let mut emit = |line: String| {
            let mut record = logger.new_record(Level::Debug, caller);
            record.set_message(line);
            logger.commit(record);
        };
        Dumper::new(&mut emit).dump(value);
    }

    /// Dump any serializable value through its JSON form.
    #[track_caller]
    pub fn dump_serialized<T: Serialize + ?Sized>(&self, value: &T) {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|e| Value::String(format!("<unserializable: {e}>")));
        self.dump(&value);
    }
}

impl Logger for Service {
    fn begin(&self, level: Level, caller: &'static Location<'static>) -> TrackedEvent {
        Service::begin(self, level, caller)
    }
}

impl Closer for Service {
    fn close(&self) -> Result<()> {
        Service::close(self)
    }
}

fn emit_timeout_warning(
    logger: &ActiveLogger,
    caller: &'static Location<'static>,
    active: usize,
    timeout_ms: u64,
) {
    if !logger.enabled(Level::Warn) {
        return;
    }
    let mut record = logger.new_record(Level::Warn, caller);
    record.set_message("Logger shutdown timed out waiting for active operations");
    record.push("active_operations", active as u64);
    record.push("timeout_ms", timeout_ms);
    logger.commit(record);
    logger.flush();
}
