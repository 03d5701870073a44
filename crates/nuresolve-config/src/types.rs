//! Settings file types.

use nuresolve_core::{DEFAULT_SUPPORTED_PLATFORMS, PlatformMoniker};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file name looked up in the project directory.
pub const SETTINGS_FILE: &str = "nuresolve.json";

/// Default declaration file pattern.
pub const DEFAULT_DECLARATION_PATTERN: &str = r"^.*NuGetPackages\.xml$";

/// Default platform when none is configured.
pub const DEFAULT_TARGET_PLATFORM: &str = "netstandard2.0";

/// Default dependency depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Upper bound accepted for `maxDepth`.
pub const MAX_DEPTH_LIMIT: usize = 1024;

/// Contents of `nuresolve.json`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectSettings {
    /// Feed files, tried in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    /// Platform to resolve for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_platform: Option<PlatformMoniker>,
    /// Platforms packages may be installed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_platforms: Option<Vec<PlatformMoniker>>,
    /// Fail when a root package is unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    /// Dependency depth limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Regex selecting declaration file names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration_pattern: Option<String>,
    /// File the dependency trees are written to after resolving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_output: Option<String>,
}

/// Fully resolved settings with every layer applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSettings {
    /// Project directory.
    pub project_dir: PathBuf,
    /// Feed files, tried in order.
    pub sources: Vec<PathBuf>,
    /// Platform to resolve for.
    pub target_platform: PlatformMoniker,
    /// Platforms packages may be installed for.
    pub supported_platforms: Vec<PlatformMoniker>,
    /// Fail when a root package is unknown.
    pub strict: bool,
    /// Dependency depth limit.
    pub max_depth: usize,
    /// Regex selecting declaration file names.
    pub declaration_pattern: String,
    /// File the dependency trees are written to after resolving.
    pub tree_output: Option<PathBuf>,
}

impl ResolvedSettings {
    /// Defaults for a project directory.
    #[must_use]
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            sources: Vec::new(),
            target_platform: PlatformMoniker::parse(DEFAULT_TARGET_PLATFORM),
            supported_platforms: DEFAULT_SUPPORTED_PLATFORMS
                .iter()
                .map(|s| PlatformMoniker::parse(s))
                .collect(),
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
            declaration_pattern: DEFAULT_DECLARATION_PATTERN.to_string(),
            tree_output: None,
        }
    }

    /// Resolve a path relative to the project directory.
    #[must_use]
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        Self::for_project(".")
    }
}
