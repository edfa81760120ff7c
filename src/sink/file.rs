//! Rotating JSON-lines file sink.
//!
//! Rotation itself is delegated to `logroller`; this sink owns the roller,
//! prunes stale backups when it opens, and can be closed exactly once.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use logroller::{Compression, LogRoller, LogRollerBuilder, Rotation, RotationSize};

use crate::error::{Error, Result};
use crate::record::Record;
use crate::sink::Sink;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Rotation limits handed to the roller.
#[derive(Debug, Clone)]
pub struct FileOptions {
    pub max_size_mb: u64,
    pub max_backups: u64,
    /// 0 keeps backups regardless of age.
    pub max_age_days: u64,
    pub compress: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            max_size_mb: 100,
            max_backups: 3,
            max_age_days: 28,
            compress: false,
        }
    }
}

/// File sink writing one JSON object per line.
pub struct FileSink {
    path: PathBuf,
    options: FileOptions,
    roller: Mutex<Option<LogRoller>>,
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish()
    }
}

impl FileSink {
    /// Open (or create) `dir/file_name` for appending.
    pub fn open(dir: &Path, file_name: &str, options: FileOptions) -> Result<Self> {
        let path = dir.join(file_name);

        if options.max_age_days > 0 {
            let max_age = Duration::from_secs(options.max_age_days.saturating_mul(SECS_PER_DAY));
            prune_backups(dir, file_name, max_age);
        }

        let mut builder = LogRollerBuilder::new(dir, Path::new(file_name))
            .rotation(Rotation::SizeBased(RotationSize::MB(options.max_size_mb)))
            .max_keep_files(options.max_backups);
        if options.compress {
            builder = builder.compression(Compression::Gzip);
        }

        let roller = builder.build().map_err(|e| Error::OpenSink {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "Rolling file sink opened");

        Ok(Self {
            path,
            options,
            roller: Mutex::new(Some(roller)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &FileOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.roller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Flush and release the file handle. Later writes are dropped.
    pub fn close(&self) -> io::Result<()> {
        let roller = self
            .roller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match roller {
            Some(mut roller) => roller.flush(),
            None => Ok(()),
        }
    }
}

impl Sink for FileSink {
    fn write(&self, record: &Record) -> io::Result<()> {
        let mut line = record.to_json_line();
        line.push('\n');
        let mut roller = self.roller.lock().unwrap_or_else(PoisonError::into_inner);
        match roller.as_mut() {
            Some(roller) => roller.write_all(line.as_bytes()),
            None => Ok(()),
        }
    }

    fn flush(&self) -> io::Result<()> {
        let mut roller = self.roller.lock().unwrap_or_else(PoisonError::into_inner);
        match roller.as_mut() {
            Some(roller) => roller.flush(),
            None => Ok(()),
        }
    }

    fn close(&self) -> io::Result<()> {
        FileSink::close(self)
    }
}

/// Remove rotated siblings of `file_name` older than `max_age`.
fn prune_backups(dir: &Path, file_name: &str, max_age: Duration) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let now = SystemTime::now();

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == file_name || !name.starts_with(file_name) {
            continue;
        }
        let modified = entry.metadata().and_then(|m| m.modified());
        let Ok(modified) = modified else {
            continue;
        };
        if now.duration_since(modified).unwrap_or_default() >= max_age {
            match fs::remove_file(entry.path()) {
                Ok(()) => tracing::debug!(file = %name, "Pruned expired log backup"),
                Err(e) => tracing::warn!(file = %name, error = %e, "Failed to prune log backup"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    fn read_logs(dir: &Path, prefix: &str) -> String {
        let mut out = String::new();
        for entry in fs::read_dir(dir).unwrap().flatten() {
            if entry.file_name().to_string_lossy().starts_with(prefix) {
                out.push_str(&fs::read_to_string(entry.path()).unwrap_or_default());
            }
        }
        out
    }

    #[test]
    fn test_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::open(dir.path(), "app.log", FileOptions::default()).unwrap();

        let mut record = Record::new(Level::Info);
        record.set_message("first");
        sink.write(&record).unwrap();
        record.set_message("second");
        sink.write(&record).unwrap();
        sink.close().unwrap();

        let logs = read_logs(dir.path(), "app.log");
        let lines: Vec<_> = logs.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["message"], "first");
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::open(dir.path(), "app.log", FileOptions::default()).unwrap();
        assert!(!sink.is_closed());
        sink.close().unwrap();
        sink.close().unwrap();
        assert!(sink.is_closed());

        // Writes after close are dropped, not errors.
        sink.write(&Record::new(Level::Info)).unwrap();
    }

    #[test]
    fn test_prune_only_touches_siblings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log.1"), "old").unwrap();
        fs::write(dir.path().join("other.log"), "keep").unwrap();

        prune_backups(dir.path(), "app.log", Duration::ZERO);

        assert!(!dir.path().join("app.log.1").exists());
        assert!(dir.path().join("other.log").exists());
    }

    #[test]
    fn test_huge_max_age_keeps_backups() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log.1"), "old").unwrap();

        let options = FileOptions {
            max_age_days: u64::MAX,
            ..FileOptions::default()
        };
        let sink = FileSink::open(dir.path(), "app.log", options).unwrap();
        sink.close().unwrap();

        assert!(dir.path().join("app.log.1").exists());
    }
}
