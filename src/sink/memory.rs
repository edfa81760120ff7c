//! In-memory capture sink.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use crate::record::Record;
use crate::sink::Sink;

/// Keeps every committed record. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of captured records.
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    /// Captured records as JSON lines.
    pub fn lines(&self) -> Vec<String> {
        self.lock().iter().map(Record::to_json_line).collect()
    }

    /// Captured messages in commit order.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.message().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether any captured JSON line contains `text`.
    pub fn contains(&self, text: &str) -> bool {
        self.lines().iter().any(|line| line.contains(text))
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sink for MemorySink {
    fn write(&self, record: &Record) -> io::Result<()> {
        self.lock().push(record.clone());
        Ok(())
    }
}
