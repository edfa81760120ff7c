//! Shared utilities for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use logsvc::{LoggingConfig, MemorySink, Service};
use tempfile::TempDir;

/// A service writing into a temporary working directory plus an in-memory sink.
pub struct Harness {
    pub service: Service,
    pub sink: MemorySink,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        let service = Service::builder()
            .with_working_dir(dir.path())
            .with_sink(Arc::new(sink.clone()))
            .build();
        Self { service, sink, dir }
    }

    /// Build and initialize with `config`.
    pub fn ready(config: LoggingConfig) -> Self {
        let harness = Self::new();
        harness.service.initialize(&config).unwrap();
        harness
    }

    #[allow(dead_code)]
    pub fn log_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }
}

/// Debug-level config without timestamps so lines compare exactly.
pub fn test_config() -> LoggingConfig {
    LoggingConfig {
        level: "debug".into(),
        with_timestamp: false,
        ..Default::default()
    }
}

/// Contents of every log file under `dir`, concatenated.
#[allow(dead_code)]
pub fn read_log_files(dir: &Path) -> String {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();
    entries
        .iter()
        .map(|p| std::fs::read_to_string(p).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("")
}
