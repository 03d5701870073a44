//! Environment variable configuration support.

use crate::error::{ConfigError, Result};
use crate::types::ResolvedSettings;
use nuresolve_core::PlatformMoniker;
use std::path::PathBuf;

/// Environment variables read by nuresolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NuresolveEnvVar {
    /// `NURESOLVE_TARGET_PLATFORM` - platform to resolve for.
    TargetPlatform,
    /// `NURESOLVE_STRICT` - fail on unknown root packages.
    Strict,
    /// `NURESOLVE_SOURCES` - feed files, separated like `PATH`.
    Sources,
    /// `NURESOLVE_MAX_DEPTH` - dependency depth limit.
    MaxDepth,
}

impl NuresolveEnvVar {
    /// Get the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TargetPlatform => "NURESOLVE_TARGET_PLATFORM",
            Self::Strict => "NURESOLVE_STRICT",
            Self::Sources => "NURESOLVE_SOURCES",
            Self::MaxDepth => "NURESOLVE_MAX_DEPTH",
        }
    }

    /// Get the value from environment.
    #[must_use]
    pub fn get(self) -> Option<String> {
        std::env::var(self.as_str()).ok().filter(|v| !v.is_empty())
    }

    /// Get as boolean (1/true/yes/on = true).
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        self.get()
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
    }
}

/// Environment configuration reader.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    /// Target platform.
    pub target_platform: Option<PlatformMoniker>,
    /// Strict mode.
    pub strict: Option<bool>,
    /// Feed files.
    pub sources: Option<Vec<PathBuf>>,
    /// Raw depth limit, validated on apply.
    pub max_depth: Option<String>,
}

impl EnvConfig {
    /// Read configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            target_platform: NuresolveEnvVar::TargetPlatform
                .get()
                .map(|v| PlatformMoniker::parse(&v)),
            strict: NuresolveEnvVar::Strict.as_bool(),
            sources: NuresolveEnvVar::Sources
                .get()
                .map(|v| std::env::split_paths(&v).collect()),
            max_depth: NuresolveEnvVar::MaxDepth.get(),
        }
    }

    /// Apply environment overrides to resolved settings.
    ///
    /// # Errors
    /// Returns error if a variable holds an unusable value.
    pub fn apply_to(&self, settings: &mut ResolvedSettings) -> Result<()> {
        if let Some(ref platform) = self.target_platform {
            settings.target_platform = platform.clone();
        }
        if let Some(strict) = self.strict {
            settings.strict = strict;
        }
        if let Some(ref sources) = self.sources {
            settings.sources = sources
                .iter()
                .map(|p| settings.resolve_path(p))
                .collect();
        }
        if let Some(ref depth) = self.max_depth {
            settings.max_depth = depth.parse().map_err(|_| ConfigError::EnvError {
                var: NuresolveEnvVar::MaxDepth.as_str().to_string(),
                message: format!("expected a positive integer, got '{depth}'"),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_names() {
        assert_eq!(
            NuresolveEnvVar::TargetPlatform.as_str(),
            "NURESOLVE_TARGET_PLATFORM"
        );
        assert_eq!(NuresolveEnvVar::Sources.as_str(), "NURESOLVE_SOURCES");
    }

    #[test]
    fn apply_overrides() {
        let mut settings = ResolvedSettings::for_project("/project");
        let env = EnvConfig {
            target_platform: Some(PlatformMoniker::parse("net46")),
            strict: Some(true),
            sources: Some(vec![PathBuf::from("feeds/a.json")]),
            max_depth: Some("8".to_string()),
        };
        env.apply_to(&mut settings).unwrap();
        assert_eq!(settings.target_platform, PlatformMoniker::parse("net46"));
        assert!(settings.strict);
        assert_eq!(settings.sources, vec![PathBuf::from("/project/feeds/a.json")]);
        assert_eq!(settings.max_depth, 8);
    }

    #[test]
    fn bad_depth_is_rejected() {
        let mut settings = ResolvedSettings::for_project("/project");
        let env = EnvConfig {
            max_depth: Some("deep".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            env.apply_to(&mut settings),
            Err(ConfigError::EnvError { .. })
        ));
    }
}
