//! Finding declaration files in a project.

use crate::declaration::{Declaration, read_declaration_file};
use crate::error::{ConfigError, Result};
use regex::{Regex, RegexBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Walk `root` for files whose name matches `pattern` (case-insensitive).
///
/// Hidden directories are not entered. Results are sorted by path.
///
/// # Errors
/// Returns error if the pattern is invalid or the tree cannot be walked.
pub fn discover_declarations(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = compile_pattern(pattern)?;

    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            match e.into_io_error() {
                Some(io) => ConfigError::io(path, io),
                None => ConfigError::Io {
                    path,
                    message: "filesystem loop".to_string(),
                },
            }
        })?;

        if entry.file_type().is_file()
            && matcher.is_match(&entry.file_name().to_string_lossy())
        {
            debug!(path = %entry.path().display(), "found declaration");
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

/// Discover and read every declaration under `root`.
///
/// # Errors
/// Returns the first read or parse failure.
pub fn load_declarations(root: &Path, pattern: &str) -> Result<Vec<Declaration>> {
    let paths = discover_declarations(root, pattern)?;
    info!(count = paths.len(), root = %root.display(), "reading declarations");

    paths
        .into_iter()
        .map(|path| {
            let requirements = read_declaration_file(&path)?;
            Ok(Declaration { path, requirements })
        })
        .collect()
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            ConfigError::invalid_value(
                "declarationPattern",
                e.to_string(),
                "use a regular expression matched against file names",
            )
        })
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}
