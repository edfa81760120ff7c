//! The immutable logger snapshot.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use chrono::Utc;

use crate::chain::ChainAnalyzer;
use crate::level::Level;
use crate::record::Record;
use crate::sink::Sink;

/// Cross-cutting enrichment run on every record just before it is written.
pub trait Hook: Send + Sync + 'static {
    fn run(&self, record: &mut Record);
}

impl<F> Hook for F
where
    F: Fn(&mut Record) + Send + Sync + 'static,
{
    fn run(&self, record: &mut Record) {
        self(record)
    }
}

/// Minimum severity, sinks and static field policy.
///
/// Never mutated once published. Changes derive a new snapshot and swap it in
/// through [`LoggerHandle`](crate::logger::LoggerHandle).
#[derive(Clone)]
pub struct ActiveLogger {
    level: Level,
    sinks: Vec<Arc<dyn Sink>>,
    with_timestamp: bool,
    capture_caller: bool,
    hooks: Vec<Arc<dyn Hook>>,
    analyzer: Arc<ChainAnalyzer>,
}

impl fmt::Debug for ActiveLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveLogger")
            .field("level", &self.level)
            .field("sinks", &self.sinks.len())
            .field("with_timestamp", &self.with_timestamp)
            .field("capture_caller", &self.capture_caller)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl ActiveLogger {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            sinks: Vec::new(),
            with_timestamp: false,
            capture_caller: false,
            hooks: Vec::new(),
            analyzer: Arc::new(ChainAnalyzer::default()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.with_timestamp = enabled;
        self
    }

    pub fn with_caller(mut self, enabled: bool) -> Self {
        self.capture_caller = enabled;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<ChainAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Derive a snapshot with one more hook appended.
    pub fn with_hook(&self, hook: Arc<dyn Hook>) -> Self {
        let mut next = self.clone();
        next.hooks.push(hook);
        next
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    pub fn analyzer(&self) -> &ChainAnalyzer {
        &self.analyzer
    }

    /// Whether a record at `level` would be written.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level && !self.sinks.is_empty()
    }

    /// Start a record carrying this snapshot's static fields.
    pub(crate) fn new_record(&self, level: Level, caller: &'static Location<'static>) -> Record {
        let mut record = Record::new(level);
        if self.capture_caller {
            record.set_caller(format!("{}:{}", caller.file(), caller.line()));
        }
        record
    }

    /// Run hooks, stamp the time and write to every sink.
    ///
    /// Sink failures are reported through `tracing` and otherwise ignored.
    pub fn commit(&self, mut record: Record) {
        if self.with_timestamp {
            record.set_time(Utc::now());
        }
        for hook in &self.hooks {
            hook.run(&mut record);
        }
        for sink in &self.sinks {
            if let Err(e) = sink.write(&record) {
                tracing::debug!(error = %e, "Log sink write failed");
            }
        }
    }

    /// Convenience for records that carry only a message.
    #[track_caller]
    pub fn log(&self, level: Level, message: impl Into<String>) {
        if !self.enabled(level) {
            return;
        }
        let mut record = self.new_record(level, Location::caller());
        record.set_message(message);
        self.commit(record);
    }

    pub fn flush(&self) {
        for sink in &self.sinks {
            let _ = sink.flush();
        }
    }
}
