//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the level name and value ranges
//! - Reject unsafe log directories (empty, `..` traversal, absolute)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - The validator is a plain value the caller constructs and owns; there is
//!   no process-wide instance

use std::path::{Component, Path};

use thiserror::Error;

use crate::config::schema::LoggingConfig;
use crate::level::Level;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("skip_frame_count must be between 0 and {max}, got {value}")]
    SkipFrameCount { value: u32, max: u32 },

    #[error("rel_log_file_dir cannot be empty")]
    EmptyLogDir,

    #[error("rel_log_file_dir cannot contain '..' (directory traversal)")]
    LogDirTraversal,

    #[error("rel_log_file_dir must be a relative path")]
    LogDirAbsolute,

    #[error("log_file_max_size_mb must be greater than zero")]
    ZeroMaxSize,
}

/// Semantic checks for [`LoggingConfig`].
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    max_skip_frames: u32,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self { max_skip_frames: 20 }
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the accepted `skip_frame_count` upper bound.
    pub fn with_max_skip_frames(mut self, max: u32) -> Self {
        self.max_skip_frames = max;
        self
    }

    /// Validate a configuration, collecting every violation.
    pub fn validate(&self, config: &LoggingConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if config.level.parse::<Level>().is_err() {
            errors.push(ValidationError::InvalidLevel(config.level.clone()));
        }

        if config.skip_frame_count > self.max_skip_frames {
            errors.push(ValidationError::SkipFrameCount {
                value: config.skip_frame_count,
                max: self.max_skip_frames,
            });
        }

        if let Err(e) = check_rel_dir(&config.rel_log_file_dir) {
            errors.push(e);
        }

        if config.file_sink_enabled() && config.log_file_max_size_mb == 0 {
            errors.push(ValidationError::ZeroMaxSize);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_rel_dir(dir: &str) -> Result<(), ValidationError> {
    if dir.trim().is_empty() {
        return Err(ValidationError::EmptyLogDir);
    }
    let path = Path::new(dir);
    if path.is_absolute() || path.has_root() {
        return Err(ValidationError::LogDirAbsolute);
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ValidationError::LogDirTraversal);
    }
    Ok(())
}
