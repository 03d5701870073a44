//! JSON output support for machine-readable CLI output.

use nuresolve_core::Error as CoreError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global JSON output mode
static JSON_OUTPUT: AtomicBool = AtomicBool::new(false);

/// Enable JSON output mode.
pub fn enable() {
    JSON_OUTPUT.store(true, Ordering::Relaxed);
}

/// Check if JSON output is enabled.
pub fn is_enabled() -> bool {
    JSON_OUTPUT.load(Ordering::Relaxed)
}

/// JSON-serializable error structure.
#[derive(Debug, Serialize)]
pub struct JsonError {
    /// Error code (e.g., "E0101")
    pub code: String,
    /// Error code title
    pub title: String,
    /// Detailed error message
    pub message: String,
    /// Suggestions for fixing the error
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Related package or file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

/// Additional context for errors.
#[derive(Debug, Serialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// JSON-serializable result structure.
#[derive(Debug, Serialize)]
pub struct JsonResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonError>,
}

impl JsonError {
    /// Create a `JsonError` from a core error.
    #[must_use]
    pub fn from_core_error(err: &CoreError) -> Self {
        let code = err.code();
        Self {
            code: code.as_str().to_string(),
            title: code.title().to_string(),
            message: err.to_string(),
            suggestions: err.suggestions().to_vec(),
            context: extract_context(err),
        }
    }

    /// Create a `JsonError` from an anyhow error.
    #[must_use]
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        if let Some(core_err) = err.downcast_ref::<CoreError>() {
            return Self::from_core_error(core_err);
        }

        Self {
            code: "E0000".to_string(),
            title: "Unknown error".to_string(),
            message: format!("{err:#}"),
            suggestions: vec![],
            context: None,
        }
    }

    /// Print this error as JSON to stderr.
    pub fn print(&self) {
        if let Ok(json) = sonic_rs::to_string_pretty(self) {
            eprintln!("{json}");
        }
    }
}

impl<T: Serialize> JsonResult<T> {
    /// Create a successful result.
    #[must_use]
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Print this result as JSON to stdout.
    pub fn print(&self) {
        if let Ok(json) = sonic_rs::to_string_pretty(self) {
            println!("{json}");
        }
    }
}

fn extract_context(err: &CoreError) -> Option<ErrorContext> {
    match err {
        CoreError::PackageNotFound { id, .. } => Some(ErrorContext {
            package: Some(id.clone()),
            file: None,
            source: None,
        }),
        CoreError::MalformedDeclaration { path, .. } => Some(ErrorContext {
            package: None,
            file: path.as_ref().map(|p| p.display().to_string()),
            source: None,
        }),
        CoreError::Io { path, .. } => Some(ErrorContext {
            package: None,
            file: Some(path.display().to_string()),
            source: None,
        }),
        CoreError::Repository { source_name, .. } => Some(ErrorContext {
            package: None,
            file: None,
            source: Some(source_name.clone()),
        }),
        _ => None,
    }
}

/// Print a successful result as JSON.
pub fn print_result<T: Serialize>(data: T) {
    JsonResult::success(data).print();
}

/// Print an error in JSON format if enabled, otherwise human-readable.
pub fn print_error(err: &anyhow::Error) {
    if is_enabled() {
        JsonError::from_anyhow(err).print();
    } else if let Some(core_err) = err.downcast_ref::<CoreError>() {
        eprintln!("{}", core_err.display_with_suggestions());
    } else {
        super::error(&format!("{err:#}"));
    }
}
