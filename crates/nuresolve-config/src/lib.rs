//! Declarations and settings for nuresolve.
//!
//! - Declaration files (`NuGetPackages.xml`) are read into
//!   [`RequirementSet`](nuresolve_core::RequirementSet) values.
//! - Declaration files are discovered by walking the project directory.
//! - Settings come from `nuresolve.json`, then `NURESOLVE_*` environment
//!   variables, then command-line flags.

#![warn(clippy::all)]

mod declaration;
mod discovery;
mod env;
pub mod error;
mod loader;
mod types;

pub use declaration::{Declaration, parse_declaration, read_declaration_file};
pub use discovery::{discover_declarations, load_declarations};
pub use env::{EnvConfig, NuresolveEnvVar};
pub use error::{ConfigError, Result};
pub use loader::{CliOverrides, ConfigSource, SettingsLoader, validate};
pub use types::{
    DEFAULT_DECLARATION_PATTERN, DEFAULT_MAX_DEPTH, DEFAULT_TARGET_PLATFORM, MAX_DEPTH_LIMIT,
    ProjectSettings, ResolvedSettings, SETTINGS_FILE,
};
