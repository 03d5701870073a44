//! Core types for nuresolve.
//!
//! This crate holds the vocabulary shared by every other crate:
//! package ids, versions and ranges, target platforms and their
//! compatibility relation, ignore rules, declared requirements and the
//! coded error type used for user-facing output.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
mod ignore;
mod package;
mod platform;
mod requirement;
mod version;

pub use error::{Error, ErrorCode, Result};
pub use ignore::{IgnoreMatcher, any_match};
pub use package::{PackageId, PackageIdError, PackageIdentity};
pub use platform::{
    DEFAULT_SUPPORTED_PLATFORMS, PlatformCompatibility, PlatformFamily, PlatformMoniker,
    PlatformVersion,
};
pub use requirement::{RequirementEntry, RequirementSet};
pub use version::{RangeParseError, ReleaseLabel, Version, VersionParseError, VersionRange};
