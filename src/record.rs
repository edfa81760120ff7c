//! Structured log record.
//!
//! A record is what one terminal call commits: severity, optional timestamp,
//! optional caller location, message and the caller's typed fields in call
//! order. Sinks receive it by reference; the file sink writes it as one JSON
//! object per line.

use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::level::Level;

/// Key the base error field is written under by `err()`.
pub const ERROR_FIELD: &str = "error";

/// One structured log object.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    level: Level,
    time: Option<DateTime<Utc>>,
    caller: Option<String>,
    message: String,
    fields: Vec<(Cow<'static, str>, Value)>,
}

impl Record {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            time: None,
            caller: None,
            message: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn caller(&self) -> Option<&str> {
        self.caller.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Fields in the order they were added.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_ref(), v))
    }

    /// First field with the given key.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.time = Some(time);
    }

    pub fn set_caller(&mut self, caller: impl Into<String>) {
        self.caller = Some(caller.into());
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Append a field. Duplicate keys are kept, in order.
    pub fn push(&mut self, key: impl Into<Cow<'static, str>>, value: impl Into<Value>) {
        self.fields.push((key.into(), value.into()));
    }

    pub(crate) fn extend<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (Cow<'static, str>, Value)>,
    {
        self.fields.extend(fields);
    }

    /// Serialize as a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> String {
        // Keys are strings and values are already JSON, so this cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("level", self.level.as_str())?;
        if let Some(time) = &self.time {
            map.serialize_entry("time", &time.to_rfc3339_opts(SecondsFormat::Millis, true))?;
        }
        if let Some(caller) = &self.caller {
            map.serialize_entry("caller", caller)?;
        }
        map.serialize_entry("message", &self.message)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key.as_ref(), value)?;
        }
        map.end()
    }
}
