//! Error types for declarations and settings.

// False positive warnings from thiserror macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type with rich diagnostics.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// File not found.
    #[error("file not found: {path}")]
    #[diagnostic(code(config::not_found), help("create the file or check the path"))]
    NotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Invalid JSON syntax.
    #[error("invalid JSON in {path}: {message}")]
    #[diagnostic(
        code(config::invalid_json),
        help("check JSON syntax at line {line}, column {column}")
    )]
    InvalidJson {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        column: usize,
    },

    /// Malformed declaration file.
    #[error("malformed declaration {path} at byte {position}: {message}")]
    #[diagnostic(
        code(config::malformed_declaration),
        help("declarations look like <packages><package id=\"...\" version=\"...\"/></packages>")
    )]
    MalformedDeclaration {
        /// File path.
        path: PathBuf,
        /// Byte offset where the problem was detected.
        position: u64,
        /// Error message.
        message: String,
    },

    /// Invalid field value.
    #[error("invalid value for '{field}': {message}")]
    #[diagnostic(code(config::invalid_value), help("{hint}"))]
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
        /// Help hint.
        hint: String,
    },

    /// Value out of range.
    #[error("value for '{field}' out of range: {value} (must be {min}..={max})")]
    #[diagnostic(code(config::out_of_range))]
    OutOfRange {
        /// Field name.
        field: String,
        /// Provided value.
        value: String,
        /// Minimum value.
        min: String,
        /// Maximum value.
        max: String,
    },

    /// IO error.
    #[error("IO error at {path}: {message}")]
    #[diagnostic(code(config::io_error))]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Permission denied.
    #[error("permission denied: {path}")]
    #[diagnostic(code(config::permission_denied), help("check file permissions"))]
    PermissionDenied {
        /// File path.
        path: PathBuf,
    },

    /// Environment variable error.
    #[error("invalid environment variable {var}: {message}")]
    #[diagnostic(code(config::env_error))]
    EnvError {
        /// Variable name.
        var: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound { path };
        }
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io {
            path,
            message: err.to_string(),
        }
    }

    /// Create a JSON parse error with location.
    #[must_use]
    pub fn json(path: impl Into<PathBuf>, err: &sonic_rs::Error) -> Self {
        Self::InvalidJson {
            path: path.into(),
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }

    /// Create a malformed declaration error.
    #[must_use]
    pub fn malformed(path: impl Into<PathBuf>, position: u64, message: impl Into<String>) -> Self {
        Self::MalformedDeclaration {
            path: path.into(),
            position,
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(
        field: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create an out of range error.
    #[must_use]
    pub fn out_of_range<T: std::fmt::Display>(
        field: impl Into<String>,
        value: T,
        min: T,
        max: T,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }
}

impl From<ConfigError> for nuresolve_core::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MalformedDeclaration {
                path,
                position,
                message,
            } => Self::malformed_declaration(message, Some(path), Some(position)),
            ConfigError::NotFound { path } => Self::io(
                path,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ),
            ConfigError::PermissionDenied { path } => Self::io(
                path,
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ),
            ConfigError::Io { path, message } => Self::io(path, std::io::Error::other(message)),
            ConfigError::InvalidValue { ref field, .. } if field == "targetPlatform" => {
                let key = field.clone();
                Self::unsupported_platform(err.to_string(), key)
            }
            ConfigError::InvalidValue { ref field, .. } | ConfigError::OutOfRange { ref field, .. } => {
                let key = field.clone();
                Self::config(err.to_string(), Some(key))
            }
            ConfigError::EnvError { ref var, .. } => {
                let key = var.clone();
                Self::config(err.to_string(), Some(key))
            }
            ConfigError::InvalidJson { .. } => Self::config(err.to_string(), None),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
