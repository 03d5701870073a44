//! Preferred version selection across ordered repositories.

use crate::repository::{Repository, RepositoryError};
use nuresolve_core::{PackageId, Version, VersionRange};
use std::sync::Arc;
use tracing::trace;

/// Pick the best version in `range`: stable beats prerelease, then highest.
///
/// ```
/// use nuresolve_resolver::best_version;
/// use nuresolve_core::{Version, VersionRange};
///
/// let versions = [Version::parse("1.0.0").unwrap(), Version::parse("2.0.0-beta").unwrap()];
/// let range = VersionRange::parse("[1.0,3.0)").unwrap();
/// assert_eq!(best_version(&versions, &range).unwrap().to_string(), "1.0.0");
/// ```
pub fn best_version<'a>(
    versions: impl IntoIterator<Item = &'a Version>,
    range: &VersionRange,
) -> Option<&'a Version> {
    versions
        .into_iter()
        .filter(|v| range.satisfies(v))
        .max_by(|a, b| {
            (!a.is_prerelease())
                .cmp(&!b.is_prerelease())
                .then_with(|| a.cmp(b))
        })
}

/// Select the preferred version of `id` from the first repository that
/// knows it.
///
/// Repositories are tried in order and never merged: once one reports any
/// versions, only those are considered. Returns `None` if no repository
/// knows the id or none of its versions satisfy `range`.
///
/// # Errors
/// Returns the first repository failure.
pub async fn select_preferred_version(
    id: &PackageId,
    range: &VersionRange,
    repositories: &[Arc<dyn Repository>],
) -> Result<Option<Version>, RepositoryError> {
    for repository in repositories {
        let Some(versions) = repository.all_versions(id).await? else {
            continue;
        };
        if versions.is_empty() {
            continue;
        }
        let selected = best_version(&versions, range).cloned();
        trace!(
            package = %id,
            range = %range,
            repository = repository.name(),
            selected = ?selected,
            "selected preferred version"
        );
        return Ok(selected);
    }
    Ok(None)
}
