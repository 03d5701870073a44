//! Settings loader with layered overrides.

use crate::env::EnvConfig;
use crate::error::{ConfigError, Result};
use crate::types::{MAX_DEPTH_LIMIT, ProjectSettings, ResolvedSettings, SETTINGS_FILE};
use nuresolve_core::PlatformMoniker;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings source in override order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in defaults.
    Defaults = 0,
    /// Project settings file.
    Project = 1,
    /// Environment variables.
    Environment = 2,
    /// CLI arguments.
    Cli = 3,
}

impl ConfigSource {
    /// Get description for display.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Defaults => "built-in defaults",
            Self::Project => "project settings",
            Self::Environment => "environment variables",
            Self::Cli => "command-line arguments",
        }
    }
}

/// Loads `nuresolve.json` and applies environment overrides.
#[derive(Debug)]
pub struct SettingsLoader {
    project_dir: PathBuf,
    env_config: EnvConfig,
}

impl SettingsLoader {
    /// Create a loader reading the process environment.
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self::with_env(project_dir, EnvConfig::from_env())
    }

    /// Create a loader with an explicit environment layer.
    #[must_use]
    pub fn with_env(project_dir: impl Into<PathBuf>, env_config: EnvConfig) -> Self {
        Self {
            project_dir: project_dir.into(),
            env_config,
        }
    }

    /// Path of the project settings file.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.project_dir.join(SETTINGS_FILE)
    }

    /// Load the project settings file, if present.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load_project_settings(&self) -> Result<Option<ProjectSettings>> {
        let path = self.settings_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::io(&path, e)),
        };
        sonic_rs::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::json(&path, &e))
    }

    /// Build resolved settings by applying every layer.
    ///
    /// # Errors
    /// Returns error if a layer holds an invalid value.
    pub fn resolve(&self) -> Result<ResolvedSettings> {
        let mut resolved = ResolvedSettings::for_project(&self.project_dir);

        if let Some(project) = self.load_project_settings()? {
            debug!(path = %self.settings_path().display(), "applying project settings");
            apply_project(&mut resolved, &project);
        }

        self.env_config.apply_to(&mut resolved)?;
        validate(&resolved)?;

        Ok(resolved)
    }

    /// Get environment configuration.
    #[must_use]
    pub const fn env(&self) -> &EnvConfig {
        &self.env_config
    }

    /// Get project directory.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

fn apply_project(resolved: &mut ResolvedSettings, project: &ProjectSettings) {
    if let Some(ref sources) = project.sources {
        resolved.sources = sources.iter().map(|s| resolved.resolve_path(s)).collect();
    }
    if let Some(ref platform) = project.target_platform {
        resolved.target_platform = platform.clone();
    }
    if let Some(ref supported) = project.supported_platforms {
        resolved.supported_platforms.clone_from(supported);
    }
    if let Some(strict) = project.strict {
        resolved.strict = strict;
    }
    if let Some(depth) = project.max_depth {
        resolved.max_depth = depth;
    }
    if let Some(ref pattern) = project.declaration_pattern {
        resolved.declaration_pattern.clone_from(pattern);
    }
    if let Some(ref tree) = project.tree_output {
        resolved.tree_output = Some(resolved.resolve_path(tree));
    }
}

/// Check resolved settings for values the resolver cannot use.
///
/// # Errors
/// Returns the first invalid value found.
pub fn validate(settings: &ResolvedSettings) -> Result<()> {
    if settings.max_depth == 0 || settings.max_depth > MAX_DEPTH_LIMIT {
        return Err(ConfigError::out_of_range(
            "maxDepth",
            settings.max_depth,
            1,
            MAX_DEPTH_LIMIT,
        ));
    }
    if let Err(e) = regex::Regex::new(&settings.declaration_pattern) {
        return Err(ConfigError::invalid_value(
            "declarationPattern",
            e.to_string(),
            "use a regular expression matched against file names",
        ));
    }
    if settings.target_platform == PlatformMoniker::Unsupported {
        return Err(ConfigError::invalid_value(
            "targetPlatform",
            "unrecognised platform",
            "use a short name such as netstandard2.0 or net46",
        ));
    }
    Ok(())
}

/// CLI settings overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Feed files replacing the configured ones.
    pub sources: Vec<PathBuf>,
    /// Target platform.
    pub target_platform: Option<PlatformMoniker>,
    /// Strict mode.
    pub strict: bool,
    /// Depth limit.
    pub max_depth: Option<usize>,
    /// Tree output file.
    pub tree_output: Option<PathBuf>,
}

impl CliOverrides {
    /// Apply CLI overrides to resolved settings.
    ///
    /// # Errors
    /// Returns error if the result fails validation.
    pub fn apply_to(&self, resolved: &mut ResolvedSettings) -> Result<()> {
        if !self.sources.is_empty() {
            resolved.sources = self.sources.iter().map(|p| resolved.resolve_path(p)).collect();
        }
        if let Some(ref platform) = self.target_platform {
            resolved.target_platform = platform.clone();
        }
        if self.strict {
            resolved.strict = true;
        }
        if let Some(depth) = self.max_depth {
            resolved.max_depth = depth;
        }
        if let Some(ref tree) = self.tree_output {
            resolved.tree_output = Some(resolved.resolve_path(tree));
        }
        validate(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_settings_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SettingsLoader::with_env(dir.path(), EnvConfig::default());
        let settings = loader.resolve().unwrap();
        assert_eq!(settings, ResolvedSettings::for_project(dir.path()));
    }

    #[test]
    fn project_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"sources": ["feed.json"], "targetPlatform": "net45", "maxDepth": 12}"#,
        )
        .unwrap();
        let env = EnvConfig {
            target_platform: Some(PlatformMoniker::parse("net46")),
            ..Default::default()
        };
        let settings = SettingsLoader::with_env(dir.path(), env).resolve().unwrap();
        assert_eq!(settings.sources, vec![dir.path().join("feed.json")]);
        assert_eq!(settings.target_platform, PlatformMoniker::parse("net46"));
        assert_eq!(settings.max_depth, 12);
    }

    #[test]
    fn invalid_json_reports_location() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ \"strict\": ").unwrap();
        let err = SettingsLoader::with_env(dir.path(), EnvConfig::default())
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson { .. }));
    }

    #[test]
    fn zero_depth_is_out_of_range() {
        let mut settings = ResolvedSettings::for_project("/p");
        settings.max_depth = 0;
        assert!(matches!(
            validate(&settings),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let mut settings = ResolvedSettings::for_project("/p");
        settings.declaration_pattern = "(".to_string();
        assert!(matches!(
            validate(&settings),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn cli_overrides_apply() {
        let mut settings = ResolvedSettings::for_project("/p");
        let overrides = CliOverrides {
            strict: true,
            max_depth: Some(5),
            tree_output: Some(PathBuf::from("out/tree.txt")),
            ..Default::default()
        };
        overrides.apply_to(&mut settings).unwrap();
        assert!(settings.strict);
        assert_eq!(settings.max_depth, 5);
        assert_eq!(settings.tree_output, Some(PathBuf::from("/p/out/tree.txt")));
    }
}
