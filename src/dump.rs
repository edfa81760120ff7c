//! Generic value dumper.
//!
//! # Responsibilities
//! - Walk a value's structure and describe it as a sequence of text lines
//! - Stay bounded: depth cap, per-container element cap, cycle detection
//!
//! # Data Flow
//! ```text
//! Service::dump(value)
//!     → Dumper::dump (root path "")
//!         → value.dump(dumper, path)
//!             → scalar / nil / record / map / seq / indirect
//!                 → child(path, value) with depth + 1
//!     → one debug record per emitted line
//! ```
//!
//! # Design Decisions
//! - Types opt in through the [`Dump`] visitor trait; there is no runtime
//!   reflection. Anything `Serialize` can go through `serde_json::Value`.
//! - Shared indirections (`Rc`, `Arc`) are identified by address. The visited
//!   set lives for one top-level call and is never unmarked, so a value
//!   reachable twice is reported as circular the second time.
//! - Dumping never fails; unrepresentable states become marker leaves.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak as RcWeak};
use std::sync::{Arc, Weak as ArcWeak};

use serde_json::Value;

/// Deepest nesting level that is still expanded.
pub const MAX_DUMP_DEPTH: usize = 10;
/// Elements shown per sequence before the remainder is summarized.
pub const MAX_DUMP_ELEMENTS: usize = 10;

const ROOT_LABEL: &str = "Dump";

/// A value that can describe its structure to a [`Dumper`].
///
/// Named-field types build a record:
///
/// ```
/// use logsvc::dump::{Dump, Dumper};
///
/// struct Endpoint {
///     host: String,
///     port: u16,
/// }
///
/// impl Dump for Endpoint {
///     fn dump(&self, d: &mut Dumper<'_>, path: &str) {
///         d.record(path, "Endpoint")
///             .field("host", &self.host)
///             .field("port", &self.port)
///             .finish();
///     }
/// }
/// ```
pub trait Dump {
    fn dump(&self, d: &mut Dumper<'_>, path: &str);
}

/// Recursive walker for one top-level dump call.
pub struct Dumper<'a> {
    out: &'a mut dyn FnMut(String),
    visited: HashSet<usize>,
    depth: usize,
}

impl fmt::Debug for Dumper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dumper")
            .field("visited", &self.visited.len())
            .field("depth", &self.depth)
            .finish()
    }
}

impl<'a> Dumper<'a> {
    /// Walker that hands every line to `out`.
    pub fn new(out: &'a mut dyn FnMut(String)) -> Self {
        Self {
            out,
            visited: HashSet::new(),
            depth: 0,
        }
    }

    /// Dump `value` from the root.
    pub fn dump<T: Dump + ?Sized>(&mut self, value: &T) {
        self.value("", value);
    }

    /// Dump a nested value one level deeper.
    pub fn child<T: Dump + ?Sized>(&mut self, path: &str, value: &T) {
        self.depth += 1;
        self.value(path, value);
        self.depth -= 1;
    }

    fn value<T: Dump + ?Sized>(&mut self, path: &str, value: &T) {
        if self.depth > MAX_DUMP_DEPTH {
            self.emit(format!("{}: <max depth reached>", label(path)));
            return;
        }
        value.dump(self, path);
    }

    /// Leaf holding a formatted value.
    pub fn scalar(&mut self, path: &str, value: &dyn fmt::Display) {
        self.emit(format!("{}: {}", label(path), value));
    }

    /// Leaf for an absent value.
    pub fn nil(&mut self, path: &str) {
        self.emit(format!("{}: <nil>", label(path)));
    }

    /// Follow a shared indirection identified by `addr`.
    pub fn indirect<T: Dump + ?Sized>(&mut self, path: &str, addr: usize, target: &T) {
        if !self.visited.insert(addr) {
            self.emit(format!("{}: <circular reference>", label(path)));
            return;
        }
        target.dump(self, path);
    }

    /// Open a named-field record. Finish it with [`DumpRecord::finish`].
    pub fn record<'d>(&'d mut self, path: &str, type_name: &str) -> DumpRecord<'d, 'a> {
        if path.is_empty() {
            self.emit(format!("Struct: {type_name}"));
        } else {
            self.emit(format!("{path}: {type_name} {{"));
        }
        DumpRecord {
            dumper: self,
            path: path.to_string(),
        }
    }

    /// Associative container: header, one entry per key, footer.
    pub fn map<'v, I>(&mut self, path: &str, type_name: &str, len: usize, entries: I)
    where
        I: IntoIterator<Item = (String, &'v dyn Dump)>,
    {
        self.emit(format!("{}: {type_name} (len: {len}) {{", label(path)));
        for (key, value) in entries {
            self.child(&format!("{path}[{key}]"), value);
        }
        self.emit(format!("{}: }}", label(path)));
    }

    /// Ordered container: header, up to [`MAX_DUMP_ELEMENTS`] entries, a
    /// summary of the remainder, footer.
    pub fn seq<'v, I>(&mut self, path: &str, type_name: &str, len: usize, cap: usize, items: I)
    where
        I: IntoIterator<Item = &'v dyn Dump>,
    {
        self.emit(format!(
            "{}: {type_name} (len: {len}, cap: {cap}) {{",
            label(path)
        ));
        for (i, item) in items.into_iter().take(MAX_DUMP_ELEMENTS).enumerate() {
            self.child(&format!("{path}[{i}]"), item);
        }
        if len > MAX_DUMP_ELEMENTS {
            self.emit(format!(
                "{}: ... ({} more elements)",
                label(path),
                len - MAX_DUMP_ELEMENTS
            ));
        }
        self.emit(format!("{}: }}", label(path)));
    }

    fn emit(&mut self, line: String) {
        (self.out)(line);
    }
}

/// Named-field record under construction.
#[must_use = "call finish() to close the record"]
pub struct DumpRecord<'d, 'a> {
    dumper: &'d mut Dumper<'a>,
    path: String,
}

impl DumpRecord<'_, '_> {
    /// Dump one visible member.
    pub fn field<T: Dump + ?Sized>(self, name: &str, value: &T) -> Self {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path)
        };
        self.dumper.child(&path, value);
        self
    }

    pub fn finish(self) {
        if !self.path.is_empty() {
            self.dumper.emit(format!("{}: }}", self.path));
        }
    }
}

/// Collect the lines `value` dumps to.
pub fn dump_lines<T: Dump + ?Sized>(value: &T) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |line: String| lines.push(line);
    Dumper::new(&mut push).dump(value);
    lines
}

/// `type_name` with module paths removed: `alloc::vec::Vec<u8>` → `Vec<u8>`.
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut token = String::new();
    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            token.push(c);
        } else {
            out.push_str(last_segment(&token));
            token.clear();
            out.push(c);
        }
    }
    out.push_str(last_segment(&token));
    out
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

fn label(path: &str) -> &str {
    if path.is_empty() {
        ROOT_LABEL
    } else {
        path
    }
}

macro_rules! dump_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Dump for $ty {
                fn dump(&self, d: &mut Dumper<'_>, path: &str) {
                    d.scalar(path, &self);
                }
            }
        )*
    };
}

dump_display!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, str,
    String,
);

impl<T: Dump + ?Sized> Dump for &T {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        (**self).dump(d, path);
    }
}

impl<T: Dump + ?Sized> Dump for Box<T> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        (**self).dump(d, path);
    }
}

impl<T: Dump> Dump for Option<T> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        match self {
            Some(value) => value.dump(d, path),
            None => d.nil(path),
        }
    }
}

impl<T: Dump + ?Sized> Dump for Rc<T> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        d.indirect(path, Rc::as_ptr(self) as *const () as usize, &**self);
    }
}

impl<T: Dump + ?Sized> Dump for Arc<T> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        d.indirect(path, Arc::as_ptr(self) as *const () as usize, &**self);
    }
}

impl<T: Dump> Dump for RcWeak<T> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        self.upgrade().dump(d, path);
    }
}

impl<T: Dump> Dump for ArcWeak<T> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        self.upgrade().dump(d, path);
    }
}

impl<T: Dump + ?Sized> Dump for RefCell<T> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        match self.try_borrow() {
            Ok(value) => value.dump(d, path),
            Err(_) => d.scalar(path, &"<borrowed>"),
        }
    }
}

impl<T: Dump> Dump for [T] {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        let items = self.iter().map(|v| v as &dyn Dump);
        d.seq(path, &short_type_name::<[T]>(), self.len(), self.len(), items);
    }
}

impl<T: Dump, const N: usize> Dump for [T; N] {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        let items = self.iter().map(|v| v as &dyn Dump);
        d.seq(path, &short_type_name::<[T; N]>(), N, N, items);
    }
}

impl<T: Dump> Dump for Vec<T> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        let items = self.iter().map(|v| v as &dyn Dump);
        d.seq(path, &short_type_name::<Vec<T>>(), self.len(), self.capacity(), items);
    }
}

impl<K: fmt::Display, V: Dump, S> Dump for HashMap<K, V, S> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        // Sorted by key text so output is stable across runs.
        let mut entries: Vec<(String, &dyn Dump)> = self
            .iter()
            .map(|(k, v)| (k.to_string(), v as &dyn Dump))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        d.map(path, &short_type_name::<HashMap<K, V>>(), self.len(), entries);
    }
}

impl<K: fmt::Display, V: Dump> Dump for BTreeMap<K, V> {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        let entries = self.iter().map(|(k, v)| (k.to_string(), v as &dyn Dump));
        d.map(path, &short_type_name::<BTreeMap<K, V>>(), self.len(), entries);
    }
}

impl Dump for Value {
    fn dump(&self, d: &mut Dumper<'_>, path: &str) {
        match self {
            Value::Null => d.nil(path),
            Value::Bool(b) => d.scalar(path, b),
            Value::Number(n) => d.scalar(path, n),
            Value::String(s) => d.scalar(path, s),
            Value::Array(items) => {
                let iter = items.iter().map(|v| v as &dyn Dump);
                d.seq(path, "Vec<Value>", items.len(), items.capacity(), iter);
            }
            Value::Object(map) => {
                let entries = map.iter().map(|(k, v)| (k.clone(), v as &dyn Dump));
                d.map(path, "Map<String, Value>", map.len(), entries);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        name: String,
        next: RefCell<Option<Rc<Node>>>,
    }

    impl Dump for Node {
        fn dump(&self, d: &mut Dumper<'_>, path: &str) {
            d.record(path, "Node")
                .field("name", &self.name)
                .field("next", &self.next)
                .finish();
        }
    }

    struct Nested {
        inner: Option<Box<Nested>>,
    }

    impl Dump for Nested {
        fn dump(&self, d: &mut Dumper<'_>, path: &str) {
            d.record(path, "Nested").field("inner", &self.inner).finish();
        }
    }

    #[test]
    fn test_scalars_and_nil() {
        assert_eq!(dump_lines(&42), vec!["Dump: 42"]);
        assert_eq!(dump_lines("text"), vec!["Dump: text"]);
        assert_eq!(dump_lines(&None::<i32>), vec!["Dump: <nil>"]);
    }

    #[test]
    fn test_record_with_nested_record() {
        struct Inner {
            id: u32,
        }
        impl Dump for Inner {
            fn dump(&self, d: &mut Dumper<'_>, path: &str) {
                d.record(path, "Inner").field("id", &self.id).finish();
            }
        }
        struct Outer {
            name: &'static str,
            inner: Inner,
        }
        impl Dump for Outer {
            fn dump(&self, d: &mut Dumper<'_>, path: &str) {
                d.record(path, "Outer")
                    .field("name", &self.name)
                    .field("inner", &self.inner)
                    .finish();
            }
        }

        let lines = dump_lines(&Outer {
            name: "svc",
            inner: Inner { id: 7 },
        });
        assert_eq!(
            lines,
            vec![
                "Struct: Outer",
                "name: svc",
                "inner: Inner {",
                "inner.id: 7",
                "inner: }",
            ]
        );
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let a = Rc::new(Node {
            name: "a".into(),
            next: RefCell::new(None),
        });
        let b = Rc::new(Node {
            name: "b".into(),
            next: RefCell::new(Some(a.clone())),
        });
        *a.next.borrow_mut() = Some(b.clone());

        let lines = dump_lines(&a);
        assert!(lines.contains(&"next.next: <circular reference>".to_string()));
        assert_eq!(lines.len(), 6);

        // Break the cycle so the nodes are freed.
        a.next.borrow_mut().take();
    }

    #[test]
    fn test_sequence_element_cap() {
        let values: Vec<u32> = (0..20).collect();
        let lines = dump_lines(&values);

        let elements = lines.iter().filter(|l| l.starts_with('[')).count();
        assert_eq!(elements, MAX_DUMP_ELEMENTS);
        assert!(lines[0].starts_with("Dump: Vec<u32> (len: 20, cap: "));
        assert!(lines.contains(&"Dump: ... (10 more elements)".to_string()));
        assert_eq!(lines.last().unwrap(), "Dump: }");
    }

    #[test]
    fn test_depth_cap() {
        let mut value = Nested { inner: None };
        for _ in 0..15 {
            value = Nested {
                inner: Some(Box::new(value)),
            };
        }
        let lines = dump_lines(&value);
        let marker = lines
            .iter()
            .find(|l| l.ends_with("<max depth reached>"))
            .unwrap();
        assert_eq!(marker.matches("inner").count(), MAX_DUMP_DEPTH + 1);
        assert_eq!(
            lines.iter().filter(|l| l.contains("<max depth reached>")).count(),
            1
        );
    }

    #[test]
    fn test_maps_are_keyed_by_text() {
        let mut map = HashMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        assert_eq!(
            dump_lines(&map),
            vec![
                "Dump: HashMap<&str, i32> (len: 2) {",
                "[a]: 1",
                "[b]: 2",
                "Dump: }",
            ]
        );
    }

    #[test]
    fn test_json_value() {
        let value = serde_json::json!({"name": "x", "tags": ["a"], "none": null});
        let lines = dump_lines(&value);
        assert_eq!(lines[0], "Dump: Map<String, Value> (len: 3) {");
        assert!(lines.contains(&"[name]: x".to_string()));
        assert!(lines.contains(&"[none]: <nil>".to_string()));
        assert!(lines.contains(&"[tags][0]: a".to_string()));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Vec<String>>(), "Vec<String>");
        assert_eq!(short_type_name::<[u8; 4]>(), "[u8; 4]");
        assert_eq!(
            short_type_name::<HashMap<String, Vec<u8>>>(),
            "HashMap<String, Vec<u8>>"
        );
    }
}
