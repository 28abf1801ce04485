//! Error types for the docs toolchain.
//!
//! Library crates use [`ToolchainError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all toolchain operations.
///
/// Inside a processing unit, any of these returned from `run` counts as an
/// internal fault. Problems found in document content are never errors of
/// this type; units report those as error records.
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Document or HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A configured pattern could not be compiled.
    #[error("invalid pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },

    /// Unrecoverable condition raised by a processing unit.
    #[error("unit '{unit}' failed: {message}")]
    Unit { unit: String, message: String },

    /// A processing unit panicked while running.
    #[error("unit '{unit}' panicked: {message}")]
    Panicked { unit: String, message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ToolchainError>;

impl ToolchainError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a unit fault tagged with the unit's name.
    pub fn unit(unit: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Unit {
            unit: unit.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ToolchainError::config("missing content directory");
        assert_eq!(err.to_string(), "config error: missing content directory");

        let err = ToolchainError::unit("combine-js", "docinfo.html unreadable");
        assert_eq!(
            err.to_string(),
            "unit 'combine-js' failed: docinfo.html unreadable"
        );
    }

    #[test]
    fn io_error_carries_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ToolchainError::io("/tmp/blacklist.txt", source);
        assert!(err.to_string().contains("blacklist.txt"));
        assert!(err.to_string().contains("gone"));
    }
}
