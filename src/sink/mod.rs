//! Output sinks.
//!
//! # Data Flow
//! ```text
//! TrackedEvent terminal call
//!     → ActiveLogger::commit (hooks, then every sink in order)
//!         → console.rs (human-readable, stderr)
//!         → file.rs (JSON lines, rotating file)
//!         → memory.rs (in-process capture)
//! ```
//!
//! # Design Decisions
//! - A sink only sees finished records; enrichment happens before commit
//! - Each sink serializes its own writes; no ordering across sinks
//! - Write failures are swallowed by the committer: logging never fails a caller

pub mod console;
pub mod file;
pub mod memory;

use std::io;

use crate::record::Record;

pub use console::{ConsoleOptions, ConsoleSink};
pub use file::{FileOptions, FileSink};
pub use memory::MemorySink;

/// Destination receiving committed records.
pub trait Sink: Send + Sync + 'static {
    /// Write one record.
    fn write(&self, record: &Record) -> io::Result<()>;

    /// Flush buffered output.
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Release the sink. Called once by the service that owns it, on Close.
    fn close(&self) -> io::Result<()> {
        self.flush()
    }
}
