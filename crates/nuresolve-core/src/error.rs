//! Error types for nuresolve operations.
//!
//! Each error has:
//! - A unique error code (e.g., E0101) for easy reference and searching
//! - A clear error message explaining what went wrong
//! - Suggestions for how to fix the issue

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for nuresolve errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Package errors (E01xx)
    /// Package not found in any repository
    E0101,
    /// Invalid package id
    E0104,

    // Resolution errors (E02xx)
    /// Dependency resolution failed
    E0201,
    /// Circular dependency detected
    E0202,
    /// Dependency tree too deep
    E0203,
    /// Resolution cancelled
    E0204,

    // Repository errors (E03xx)
    /// Repository query failed
    E0301,
    /// Invalid feed content
    E0302,

    // Declaration errors (E04xx)
    /// Malformed declaration file
    E0401,
    /// Missing required attribute
    E0402,
    /// Invalid version or range format
    E0404,

    // IO errors (E05xx)
    /// File not found
    E0501,
    /// Permission denied
    E0502,

    // Configuration errors (E11xx)
    /// Invalid configuration
    E1101,

    // Platform errors (E12xx)
    /// Unsupported platform
    E1201,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0104 => "E0104",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0203 => "E0203",
            Self::E0204 => "E0204",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0401 => "E0401",
            Self::E0402 => "E0402",
            Self::E0404 => "E0404",
            Self::E0501 => "E0501",
            Self::E0502 => "E0502",
            Self::E1101 => "E1101",
            Self::E1201 => "E1201",
        }
    }

    /// Get a brief title for this error code.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::E0101 => "Package not found",
            Self::E0104 => "Invalid package id",
            Self::E0201 => "Resolution failed",
            Self::E0202 => "Circular dependency",
            Self::E0203 => "Dependency tree too deep",
            Self::E0204 => "Resolution cancelled",
            Self::E0301 => "Repository error",
            Self::E0302 => "Invalid feed",
            Self::E0401 => "Malformed declaration",
            Self::E0402 => "Missing required attribute",
            Self::E0404 => "Invalid version range",
            Self::E0501 => "File not found",
            Self::E0502 => "Permission denied",
            Self::E1101 => "Invalid configuration",
            Self::E1201 => "Unsupported platform",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for nuresolve.
#[derive(Error, Debug)]
pub enum Error {
    /// Package not found.
    #[error("[{code}] package '{id}' not found in any source")]
    PackageNotFound {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// Package id.
        id: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Dependency resolution failed.
    #[error("[{code}] resolution failed: {message}")]
    Resolution {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// Error message.
        message: String,
        /// Root packages involved in the conflict.
        conflicting_packages: Vec<String>,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Circular dependency.
    #[error("[{code}] circular dependency detected: {cycle}")]
    CircularDependency {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// The dependency cycle.
        cycle: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Repository error.
    #[error("[{code}] repository '{source_name}' failed: {message}")]
    Repository {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// Repository name.
        source_name: String,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Malformed declaration.
    #[error("[{code}] malformed declaration: {message}")]
    MalformedDeclaration {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// Error message.
        message: String,
        /// File path.
        path: Option<PathBuf>,
        /// Byte offset in the file (if applicable).
        position: Option<u64>,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// IO error.
    #[error("[{code}] io error at {path}: {message}")]
    Io {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Configuration error.
    #[error("[{code}] config error: {message}")]
    Config {
        /// Error code.
        #[source]
        code: ErrorCodeSource,
        /// Error message.
        message: String,
        /// Configuration key.
        key: Option<String>,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Resolution was cancelled.
    #[error("[E0204] resolution cancelled")]
    Cancelled,
}

/// Wrapper to make `ErrorCode` usable as a source.
#[derive(Debug)]
pub struct ErrorCodeSource(pub ErrorCode);

impl fmt::Display for ErrorCodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

impl std::error::Error for ErrorCodeSource {}

impl Error {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::PackageNotFound { code, .. }
            | Self::Resolution { code, .. }
            | Self::CircularDependency { code, .. }
            | Self::Repository { code, .. }
            | Self::MalformedDeclaration { code, .. }
            | Self::Io { code, .. }
            | Self::Config { code, .. } => code.0,
            Self::Cancelled => ErrorCode::E0204,
        }
    }

    /// Get suggestions for fixing this error.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::PackageNotFound { suggestions, .. }
            | Self::Resolution { suggestions, .. }
            | Self::CircularDependency { suggestions, .. }
            | Self::Repository { suggestions, .. }
            | Self::MalformedDeclaration { suggestions, .. }
            | Self::Io { suggestions, .. }
            | Self::Config { suggestions, .. } => suggestions,
            Self::Cancelled => &[],
        }
    }

    /// Create an IO error with context.
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let (code, suggestions) = match err.kind() {
            std::io::ErrorKind::PermissionDenied => (
                ErrorCode::E0502,
                vec![
                    format!("Check permissions on: {}", path.display()),
                    "Try running with appropriate permissions".to_string(),
                ],
            ),
            std::io::ErrorKind::NotFound => (
                ErrorCode::E0501,
                vec![
                    format!("Check if the path exists: {}", path.display()),
                    "Verify you're in the correct directory".to_string(),
                ],
            ),
            _ => (
                ErrorCode::E0501,
                vec![format!("Check the file: {}", path.display())],
            ),
        };
        Self::Io {
            code: ErrorCodeSource(code),
            path,
            message: err.to_string(),
            suggestions,
        }
    }

    /// Create a package not found error with suggestions.
    #[must_use]
    pub fn package_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::PackageNotFound {
            code: ErrorCodeSource(ErrorCode::E0101),
            suggestions: vec![
                "Check the package id for typos".to_string(),
                format!("Verify that one of the configured sources publishes '{id}'"),
                "Run without --strict to continue past unknown roots".to_string(),
            ],
            id,
        }
    }

    /// Create a resolution error with context.
    #[must_use]
    pub fn resolution(message: impl Into<String>, conflicting: Vec<String>) -> Self {
        let message = message.into();
        let mut suggestions = vec![
            "Run 'nuresolve tree' to inspect the dependency paths".to_string(),
            "Relax the allowedVersions of the conflicting roots".to_string(),
        ];
        if !conflicting.is_empty() {
            suggestions.insert(0, format!("Conflicting roots: {}", conflicting.join(", ")));
        }
        Self::Resolution {
            code: ErrorCodeSource(ErrorCode::E0201),
            message,
            conflicting_packages: conflicting,
            suggestions,
        }
    }

    /// Create a circular dependency error.
    #[must_use]
    pub fn circular_dependency(cycle: impl Into<String>) -> Self {
        Self::CircularDependency {
            code: ErrorCodeSource(ErrorCode::E0202),
            cycle: cycle.into(),
            suggestions: vec![
                "A package version transitively depends on itself".to_string(),
                "Pin a different version of one of the packages in the cycle".to_string(),
            ],
        }
    }

    /// Create a depth limit error.
    #[must_use]
    pub fn depth_exceeded(path: impl Into<String>, max_depth: usize) -> Self {
        Self::Resolution {
            code: ErrorCodeSource(ErrorCode::E0203),
            message: format!("dependency tree deeper than {max_depth}: {}", path.into()),
            conflicting_packages: Vec::new(),
            suggestions: vec!["Increase maxDepth in nuresolve.json".to_string()],
        }
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Repository {
            code: ErrorCodeSource(if message.contains("parse") || message.contains("invalid") {
                ErrorCode::E0302
            } else {
                ErrorCode::E0301
            }),
            source_name: source_name.into(),
            message,
            suggestions: vec![
                "Check the sources listed in nuresolve.json".to_string(),
                "Verify the feed file is valid JSON".to_string(),
            ],
        }
    }

    /// Create a malformed declaration error.
    #[must_use]
    pub fn malformed_declaration(
        message: impl Into<String>,
        path: Option<PathBuf>,
        position: Option<u64>,
    ) -> Self {
        let message = message.into();
        let code = if message.contains("missing") {
            ErrorCode::E0402
        } else if message.contains("package id") {
            ErrorCode::E0104
        } else if message.contains("version") || message.contains("range") {
            ErrorCode::E0404
        } else {
            ErrorCode::E0401
        };
        let mut suggestions = vec!["Validate your declarations: nuresolve validate".to_string()];
        if let Some(ref p) = path {
            suggestions.push(format!("Edit the file: {}", p.display()));
        }
        if let Some(pos) = position {
            suggestions.push(format!("Error is near byte {pos}"));
        }
        Self::MalformedDeclaration {
            code: ErrorCodeSource(code),
            message,
            path,
            position,
            suggestions,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>, key: Option<String>) -> Self {
        let mut suggestions = vec!["Check nuresolve.json for typos".to_string()];
        if let Some(ref k) = key {
            suggestions.push(format!("Review the '{k}' setting"));
        }
        Self::Config {
            code: ErrorCodeSource(ErrorCode::E1101),
            message: message.into(),
            key,
            suggestions,
        }
    }

    /// Create an unsupported platform error for a configuration key.
    #[must_use]
    pub fn unsupported_platform(message: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self::Config {
            code: ErrorCodeSource(ErrorCode::E1201),
            message: message.into(),
            suggestions: vec![
                "Use a short platform name such as netstandard2.0 or net46".to_string(),
                format!("Review the '{key}' setting"),
            ],
            key: Some(key),
        }
    }

    /// Format the error with suggestions for display.
    #[must_use]
    pub fn display_with_suggestions(&self) -> String {
        let mut output = format!("{self}");
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                output.push_str(&format!("\n  • {suggestion}"));
            }
        }
        output.push_str(&format!("\n\n{}: {}", self.code(), self.code().title()));
        output
    }
}

/// Result type for nuresolve operations.
pub type Result<T> = std::result::Result<T, Error>;
