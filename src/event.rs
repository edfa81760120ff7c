//! Tracked record builder.
//!
//! # Responsibilities
//! - Accumulate typed fields for exactly one record
//! - Enrich attached errors with their full causal chain
//! - Commit the record to the snapshot it was opened against and release
//!   the service's quiescence permit
//!
//! # Design Decisions
//! - Single owner: the builder is moved through the fluent chain and never
//!   shared, so field setters need no synchronization
//! - Terminal calls consume the builder; a second terminal call cannot compile
//! - An inert builder (service not ready, level disabled) ignores everything
//!   and never touches shared state

use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde_json::Value;

use crate::fields::{error_fields, Fields, Key};
use crate::level::Level;
use crate::lifecycle::OpPermit;
use crate::logger::ActiveLogger;
use crate::record::Record;

/// An open record counted against the service's in-flight operations.
#[must_use = "a TrackedEvent writes nothing until msg(), msgf() or send() is called"]
pub struct TrackedEvent {
    live: Option<Live>,
}

struct Live {
    record: Record,
    logger: Arc<ActiveLogger>,
    permit: Option<OpPermit>,
}

impl fmt::Debug for TrackedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.live {
            Some(live) => f
                .debug_struct("TrackedEvent")
                .field("level", &live.record.level())
                .field("fields", &live.record.fields().count())
                .finish(),
            None => f.write_str("TrackedEvent(inert)"),
        }
    }
}

impl TrackedEvent {
    /// Builder that discards everything.
    pub fn disabled() -> Self {
        Self { live: None }
    }

    /// Open a record against `logger`, holding `permit` until commit.
    pub(crate) fn open(
        logger: Arc<ActiveLogger>,
        level: Level,
        caller: &'static Location<'static>,
        permit: Option<OpPermit>,
    ) -> Self {
        let record = logger.new_record(level, caller);
        Self {
            live: Some(Live {
                record,
                logger,
                permit,
            }),
        }
    }

    /// Open a record directly against a snapshot, outside any service.
    #[track_caller]
    pub fn untracked(logger: Arc<ActiveLogger>, level: Level) -> Self {
        if !logger.enabled(level) {
            return Self::disabled();
        }
        Self::open(logger, level, Location::caller(), None)
    }

    /// Whether this builder will write anything.
    pub fn is_enabled(&self) -> bool {
        self.live.is_some()
    }

    pub(crate) fn extend<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (Key, Value)>,
    {
        if let Some(live) = self.live.as_mut() {
            live.record.extend(fields);
        }
        self
    }

    /// Commit with `message`.
    pub fn msg(self, message: impl Into<String>) {
        self.commit(Some(message.into()));
    }

    /// Commit with a formatted message: `event.msgf(format_args!("{} items", n))`.
    pub fn msgf(self, args: fmt::Arguments<'_>) {
        if self.live.is_some() {
            self.commit(Some(fmt::format(args)));
        }
    }

    /// Commit with an empty message.
    pub fn send(self) {
        self.commit(None);
    }

    fn commit(self, message: Option<String>) {
        let Some(Live {
            mut record,
            logger,
            permit,
        }) = self.live
        else {
            return;
        };

        if let Some(message) = message {
            record.set_message(message);
        }
        let level = record.level();
        let panic_message = (level == Level::Panic).then(|| record.message().to_string());

        logger.commit(record);
        drop(permit);

        match level {
            Level::Fatal => {
                logger.flush();
                std::process::exit(1);
            }
            Level::Panic => panic!("{}", panic_message.unwrap_or_default()),
            _ => {}
        }
    }
}

impl Fields for TrackedEvent {
    fn put(mut self, key: impl Into<Key>, value: impl FnOnce() -> Value) -> Self {
        if let Some(live) = self.live.as_mut() {
            live.record.push(key, value());
        }
        self
    }

    /// Writes `key`, then `key_chain`, `key_root`, `key_history`, `key_ops`
    /// and, when known, `key_root_op`.
    fn an_err(mut self, key: impl Into<Key>, err: &(dyn StdError + 'static)) -> Self {
        if let Some(live) = self.live.as_mut() {
            for (key, value) in error_fields(key.into(), err, live.logger.analyzer()) {
                live.record.push(key, value);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::OpError;
    use crate::sink::MemorySink;

    fn logger(level: Level) -> (Arc<ActiveLogger>, MemorySink) {
        let sink = MemorySink::new();
        let logger = ActiveLogger::new(level).with_sink(Arc::new(sink.clone()));
        (Arc::new(logger), sink)
    }

    #[test]
    fn test_fields_in_call_order() {
        let (logger, sink) = logger(Level::Debug);
        TrackedEvent::untracked(logger, Level::Info)
            .str("user_id", "u1")
            .int("count", 5)
            .msg("processed");

        assert_eq!(
            sink.lines(),
            vec![r#"{"level":"info","message":"processed","user_id":"u1","count":5}"#]
        );
    }

    #[test]
    fn test_disabled_level_is_inert() {
        let (logger, sink) = logger(Level::Warn);
        let event = TrackedEvent::untracked(logger, Level::Info);
        assert!(!event.is_enabled());
        event.str("k", "v").msg("dropped");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_msgf_and_send() {
        let (logger, sink) = logger(Level::Trace);
        TrackedEvent::untracked(logger.clone(), Level::Debug).msgf(format_args!("{} items", 3));
        TrackedEvent::untracked(logger, Level::Trace).bool("ok", true).send();
        assert_eq!(sink.messages(), vec!["3 items", ""]);
    }

    #[test]
    fn test_err_enrichment() {
        let (logger, sink) = logger(Level::Debug);
        let inner = OpError::new("db.Connect", "connection refused");
        let outer = OpError::new("server.Start", "startup failed").with_cause(inner);

        TrackedEvent::untracked(logger, Level::Error)
            .err(&outer)
            .msg("boom");

        let line: Value = serde_json::from_str(&sink.lines()[0]).unwrap();
        assert_eq!(line["error"], "startup failed");
        assert_eq!(
            line["error_chain"],
            serde_json::json!(["startup failed", "connection refused"])
        );
        assert_eq!(line["error_root"], "connection refused");
        assert_eq!(line["error_history"], "startup failed -> connection refused");
        assert_eq!(line["error_ops"], serde_json::json!(["server.Start", "db.Connect"]));
        assert_eq!(line["error_root_op"], "db.Connect");
    }

    #[test]
    fn test_err_key_precedes_its_enrichment() {
        let (logger, sink) = logger(Level::Debug);
        let err = OpError::new("db.Connect", "connection refused");

        TrackedEvent::untracked(logger, Level::Error)
            .str("request", "r1")
            .err(&err)
            .send();

        let record = &sink.records()[0];
        let keys: Vec<&str> = record.fields().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "request",
                "error",
                "error_chain",
                "error_root",
                "error_history",
                "error_ops",
                "error_root_op",
            ]
        );
    }

    #[test]
    fn test_distinct_error_keys_do_not_collide() {
        let (logger, sink) = logger(Level::Debug);
        let first = std::io::Error::new(std::io::ErrorKind::Other, "first");
        let second = OpError::new("cache.Get", "second");

        TrackedEvent::untracked(logger, Level::Warn)
            .an_err("read_err", &first)
            .an_err("cache_err", &second)
            .send();

        let record = &sink.records()[0];
        assert_eq!(record.field("read_err").unwrap(), "first");
        assert_eq!(record.field("cache_err_root").unwrap(), "second");
        assert_eq!(record.field("cache_err_root_op").unwrap(), "cache.Get");
        assert!(record.field("read_err_root_op").is_none());
    }

    #[test]
    #[should_panic(expected = "invariant broken")]
    fn test_panic_level_panics_after_commit() {
        let (logger, _sink) = logger(Level::Debug);
        TrackedEvent::untracked(logger, Level::Panic).msg("invariant broken");
    }
}
