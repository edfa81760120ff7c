//! Typed field setters shared by every fluent builder.
//!
//! [`TrackedEvent`](crate::TrackedEvent), [`Dict`] and
//! [`LogContext`](crate::LogContext) only implement [`Fields::put`]; the typed
//! setters are provided on top of it. Values are built lazily so an inert
//! builder never pays for formatting.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Write as _};
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::chain::ChainAnalyzer;
use crate::record::ERROR_FIELD;

/// Field key type accepted by every setter.
pub type Key = Cow<'static, str>;

/// Fluent, typed field accumulation.
pub trait Fields: Sized {
    /// Append `key` with the value produced by `value`.
    ///
    /// Implementations skip calling `value` when the builder is inert.
    fn put(self, key: impl Into<Key>, value: impl FnOnce() -> Value) -> Self;

    fn str(self, key: impl Into<Key>, val: &str) -> Self {
        self.put(key, || Value::from(val))
    }

    fn strs<S: AsRef<str>>(self, key: impl Into<Key>, vals: &[S]) -> Self {
        self.put(key, || {
            Value::Array(vals.iter().map(|s| Value::from(s.as_ref())).collect())
        })
    }

    /// Any `Display` value, written as a string.
    fn stringer(self, key: impl Into<Key>, val: &dyn fmt::Display) -> Self {
        self.put(key, || Value::String(val.to_string()))
    }

    fn int(self, key: impl Into<Key>, val: impl Into<i64>) -> Self {
        let val = val.into();
        self.put(key, || Value::from(val))
    }

    fn uint(self, key: impl Into<Key>, val: impl Into<u64>) -> Self {
        let val = val.into();
        self.put(key, || Value::from(val))
    }

    /// Non-finite values are written as `null`.
    fn float(self, key: impl Into<Key>, val: impl Into<f64>) -> Self {
        let val = val.into();
        self.put(key, || Value::from(val))
    }

    fn bool(self, key: impl Into<Key>, val: bool) -> Self {
        self.put(key, || Value::Bool(val))
    }

    fn bools(self, key: impl Into<Key>, vals: &[bool]) -> Self {
        self.put(key, || Value::Array(vals.iter().copied().map(Value::Bool).collect()))
    }

    /// RFC 3339 timestamp.
    fn time(self, key: impl Into<Key>, val: impl Into<DateTime<Utc>>) -> Self {
        let val = val.into();
        self.put(key, || {
            Value::String(val.to_rfc3339_opts(SecondsFormat::Millis, true))
        })
    }

    /// Duration in (fractional) milliseconds.
    fn dur(self, key: impl Into<Key>, val: Duration) -> Self {
        self.put(key, || Value::from(val.as_secs_f64() * 1000.0))
    }

    /// Attach an error under the `error` key.
    fn err(self, err: &(dyn StdError + 'static)) -> Self {
        self.an_err(ERROR_FIELD, err)
    }

    /// Attach an error under `key`.
    ///
    /// Writes the message only. Builders that can reach a
    /// [`ChainAnalyzer`] override this to add the chain fields.
    fn an_err(self, key: impl Into<Key>, err: &(dyn StdError + 'static)) -> Self {
        self.put(key, || Value::String(err.to_string()))
    }

    /// Raw bytes, written as (lossy) UTF-8 text.
    fn bytes(self, key: impl Into<Key>, val: &[u8]) -> Self {
        self.put(key, || Value::String(String::from_utf8_lossy(val).into_owned()))
    }

    /// Lowercase hex string.
    fn hex(self, key: impl Into<Key>, val: &[u8]) -> Self {
        self.put(key, || Value::String(to_hex(val)))
    }

    fn ip_addr(self, key: impl Into<Key>, val: IpAddr) -> Self {
        self.put(key, || Value::String(val.to_string()))
    }

    /// Colon-separated hardware address.
    fn mac_addr(self, key: impl Into<Key>, val: [u8; 6]) -> Self {
        self.put(key, || {
            let parts: Vec<String> = val.iter().map(|b| format!("{b:02x}")).collect();
            Value::String(parts.join(":"))
        })
    }

    /// Any serializable value. Serialization failures are written as the
    /// error text rather than dropping the field.
    fn interface<T: Serialize + ?Sized>(self, key: impl Into<Key>, val: &T) -> Self {
        self.put(key, || {
            serde_json::to_value(val).unwrap_or_else(|e| Value::String(format!("!ERROR: {e}")))
        })
    }

    /// Nested object built by `build`.
    fn dict(self, key: impl Into<Key>, build: impl FnOnce(Dict) -> Dict) -> Self {
        self.put(key, || build(Dict::new()).into_value())
    }
}

/// Nested object for [`Fields::dict`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    map: Map<String, Value>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.map)
    }
}

impl Fields for Dict {
    fn put(mut self, key: impl Into<Key>, value: impl FnOnce() -> Value) -> Self {
        self.map.insert(key.into().into_owned(), value());
        self
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// `key` followed by `key_chain`, `key_root`, `key_history`, `key_ops` and,
/// when known, `key_root_op`.
pub(crate) fn error_fields(
    key: Key,
    err: &(dyn StdError + 'static),
    analyzer: &ChainAnalyzer,
) -> Vec<(Key, Value)> {
    let chain = analyzer.analyze(err);
    let mut fields = vec![(key.clone(), Value::String(err.to_string()))];

    fields.push((format!("{key}_chain").into(), to_array(&chain.chain)));
    fields.push((format!("{key}_root").into(), Value::String(chain.root.clone())));
    fields.push((format!("{key}_history").into(), Value::String(chain.history())));
    fields.push((format!("{key}_ops").into(), to_array(&chain.ops)));
    if !chain.root_op.is_empty() {
        fields.push((format!("{key}_root_op").into(), Value::String(chain.root_op)));
    }
    fields
}

fn to_array(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_dict_setters() {
        let value = Dict::new()
            .str("name", "ada")
            .int("age", 36i32)
            .uint("id", 7u8)
            .float("ratio", 0.5f32)
            .bool("admin", true)
            .strs("tags", &["a", "b"])
            .bools("flags", &[true, false])
            .hex("key", &[0xde, 0xad])
            .bytes("raw", b"hi")
            .ip_addr("ip", IpAddr::V4(Ipv4Addr::LOCALHOST))
            .mac_addr("mac", [0, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f])
            .dur("took", Duration::from_millis(1500))
            .into_value();

        assert_eq!(value["name"], "ada");
        assert_eq!(value["age"], 36);
        assert_eq!(value["id"], 7);
        assert_eq!(value["ratio"], 0.5);
        assert_eq!(value["admin"], true);
        assert_eq!(value["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(value["flags"], serde_json::json!([true, false]));
        assert_eq!(value["key"], "dead");
        assert_eq!(value["raw"], "hi");
        assert_eq!(value["ip"], "127.0.0.1");
        assert_eq!(value["mac"], "00:1b:2c:3d:4e:5f");
        assert_eq!(value["took"], 1500.0);
    }

    #[test]
    fn test_nested_dict_and_interface() {
        #[derive(Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }

        let value = Dict::new()
            .dict("outer", |d| d.dict("inner", |d| d.str("leaf", "v")))
            .interface("point", &Point { x: 1, y: 2 })
            .into_value();

        assert_eq!(value["outer"]["inner"]["leaf"], "v");
        assert_eq!(value["point"], serde_json::json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_plain_err_and_time() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let when = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let value = Dict::new().err(&err).time("at", when).into_value();
        assert_eq!(value["error"], "missing");
        assert_eq!(value["at"], "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_stringer() {
        let value = Dict::new()
            .stringer("addr", &Ipv4Addr::new(10, 0, 0, 1))
            .into_value();
        assert_eq!(value["addr"], "10.0.0.1");
    }
}
