//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (or empty) file is accepted.

use serde::{Deserialize, Serialize};

/// Shutdown wait used when `shutdown_timeout_ms` is zero.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 100;

/// Root configuration consumed by [`Service::initialize`](crate::Service::initialize).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum severity (trace, debug, info, warn, error, fatal, panic).
    pub level: String,

    /// Enable the console sink.
    pub console_logging: bool,

    /// Enable the rotating file sink.
    /// If neither sink is enabled the file sink is forced on.
    pub file_logging: bool,

    /// Log directory, relative to the working directory.
    pub rel_log_file_dir: String,

    /// Rotate the log file once it reaches this size.
    pub log_file_max_size_mb: u64,

    /// Number of rotated files kept.
    pub log_file_max_backups: u64,

    /// Rotated files older than this are pruned when the sink opens (0 = keep).
    pub log_file_max_age_days: u64,

    /// Gzip rotated files.
    pub log_file_compress: bool,

    /// Disable ANSI colour on the console sink.
    pub console_no_color: bool,

    /// strftime format for console timestamps.
    pub console_time_format: Option<String>,

    /// Add a `time` field to every record.
    pub with_timestamp: bool,

    /// 0 disables caller capture; any positive value enables it.
    pub skip_frame_count: u32,

    /// Upper bound on how long Close waits for in-flight records.
    pub shutdown_timeout_ms: u64,

    /// Emit a warning record when Close gives up waiting.
    pub shutdown_timeout_warning: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_logging: false,
            file_logging: true,
            rel_log_file_dir: "logs".to_string(),
            log_file_max_size_mb: 100,
            log_file_max_backups: 3,
            log_file_max_age_days: 28,
            log_file_compress: false,
            console_no_color: false,
            console_time_format: None,
            with_timestamp: true,
            skip_frame_count: 0,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            shutdown_timeout_warning: false,
        }
    }
}

impl LoggingConfig {
    /// Whether the file sink ends up enabled after the both-off policy.
    pub fn file_sink_enabled(&self) -> bool {
        self.file_logging || !self.console_logging
    }

    /// Close's wait bound, falling back to the default when unset.
    pub fn shutdown_timeout(&self) -> std::time::Duration {
        let ms = match self.shutdown_timeout_ms {
            0 => DEFAULT_SHUTDOWN_TIMEOUT_MS,
            ms => ms,
        };
        std::time::Duration::from_millis(ms)
    }
}
