//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve the working directory when none was supplied
//! - Create the log directory
//! - Resolve the executable name used for the default log file
//! - Build the sink set from the console/file switches
//! - Assemble the initial [`ActiveLogger`]
//!
//! # Design Decisions
//! - Fail fast: any error aborts Initialize before anything is published
//! - Both switches off means the file sink is forced on

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::chain::ChainAnalyzer;
use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use crate::level::Level;
use crate::logger::ActiveLogger;
use crate::sink::{ConsoleOptions, ConsoleSink, FileOptions, FileSink, Sink};

const FALLBACK_EXE_NAME: &str = "app";

/// Sinks built for one Initialize, plus the file sink the service owns.
pub struct SinkSet {
    pub sinks: Vec<Arc<dyn Sink>>,
    pub file: Option<Arc<FileSink>>,
}

/// Use `configured` or fall back to the process's current directory.
pub fn resolve_working_dir(configured: Option<&Path>) -> Result<PathBuf> {
    match configured {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.to_path_buf()),
        _ => std::env::current_dir().map_err(|e| Error::WorkingDir(Arc::new(e))),
    }
}

/// Create `path` and its parents if missing.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| Error::CreateDirectory {
        path: path.to_path_buf(),
        source: Arc::new(e),
    })?;
    tracing::debug!(path = %path.display(), "Created log directory");
    Ok(())
}

/// File stem of the running executable.
pub fn executable_name() -> Result<String> {
    let exe = std::env::current_exe().map_err(|e| Error::ExecutableName(e.to_string()))?;
    let name = exe
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_EXE_NAME.to_string());
    Ok(name)
}

/// Build the configured sinks. `log_dir` must already exist.
pub fn build_sinks(config: &LoggingConfig, log_dir: &Path) -> Result<SinkSet> {
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
    let mut file = None;

    if config.file_sink_enabled() {
        let file_name = format!("{}.log", executable_name()?);
        tracing::debug!(dir = %log_dir.display(), file = %file_name, "Initializing rolling file sink");
        let sink = Arc::new(FileSink::open(
            log_dir,
            &file_name,
            FileOptions {
                max_size_mb: config.log_file_max_size_mb,
                max_backups: config.log_file_max_backups,
                max_age_days: config.log_file_max_age_days,
                compress: config.log_file_compress,
            },
        )?);
        sinks.push(sink.clone());
        file = Some(sink);
    }

    if config.console_logging {
        sinks.push(Arc::new(ConsoleSink::new(ConsoleOptions {
            no_color: config.console_no_color,
            time_format: config.console_time_format.clone(),
        })));
    }

    Ok(SinkSet { sinks, file })
}

/// Assemble the first snapshot from a validated config.
pub fn build_logger(
    config: &LoggingConfig,
    sinks: Vec<Arc<dyn Sink>>,
    analyzer: Arc<ChainAnalyzer>,
) -> Result<ActiveLogger> {
    let level: Level = config.level.parse()?;
    let logger = sinks.into_iter().fold(
        ActiveLogger::new(level)
            .with_timestamp(config.with_timestamp)
            .with_caller(config.skip_frame_count > 0)
            .with_analyzer(analyzer),
        ActiveLogger::with_sink,
    );
    Ok(logger)
}
