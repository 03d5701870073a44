//! Declaration file reader.
//!
//! Declarations are XML documents of the form:
//!
//! ```xml
//! <packages>
//!   <package id="A" version="2.0.0" allowedVersions="[1.0,3.0)"
//!            targetFramework="netstandard2.0" developmentDependency="true">
//!     <ignore id="A.Internal.*"/>
//!   </package>
//!   <ignore id="System.*"/>
//! </packages>
//! ```

use crate::error::{ConfigError, Result};
use nuresolve_core::{
    IgnoreMatcher, PackageId, PlatformMoniker, RequirementEntry, RequirementSet, Version,
    VersionRange,
};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const ROOT_ELEMENT: &[u8] = b"packages";
const PACKAGE_ELEMENT: &[u8] = b"package";
const IGNORE_ELEMENT: &[u8] = b"ignore";

/// Read a declaration file.
///
/// # Errors
/// Returns error if the file cannot be read or is malformed.
pub fn read_declaration_file(path: &Path) -> Result<RequirementSet> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    parse_declaration(&content, path)
}

/// Where the reader currently is in the document.
enum Scope {
    Document,
    Packages,
    Package(RequirementEntry),
    Done,
}

/// Parse declaration text. `path` is only used for error reporting.
///
/// # Errors
/// Returns `MalformedDeclaration` on any syntax or content problem.
pub fn parse_declaration(content: &str, path: &Path) -> Result<RequirementSet> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut set = RequirementSet::new();
    let mut scope = Scope::Document;
    // Depth inside elements we don't understand
    let mut skip = 0usize;

    loop {
        let position = u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX);
        let malformed = |message: String| ConfigError::malformed(path, position, message);

        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("invalid XML: {e}")))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                if skip > 0 {
                    if is_start {
                        skip += 1;
                    }
                    continue;
                }

                let name = e.local_name();
                match (&mut scope, name.as_ref()) {
                    (Scope::Document, ROOT_ELEMENT) => {
                        scope = if is_start { Scope::Packages } else { Scope::Done };
                    }
                    (Scope::Document, other) => {
                        return Err(malformed(format!(
                            "root element must be 'packages', found '{}'",
                            String::from_utf8_lossy(other)
                        )));
                    }
                    (Scope::Packages, PACKAGE_ELEMENT) => {
                        let entry = read_package(e).map_err(malformed)?;
                        trace!(package = %entry.id, "declared package");
                        if is_start {
                            scope = Scope::Package(entry);
                        } else {
                            set.packages.push(entry);
                        }
                    }
                    (Scope::Packages, IGNORE_ELEMENT) => {
                        set.ignores.push(read_ignore(e).map_err(malformed)?);
                        if is_start {
                            skip = 1;
                        }
                    }
                    (Scope::Package(entry), IGNORE_ELEMENT) => {
                        entry.ignores.push(read_ignore(e).map_err(malformed)?);
                        if is_start {
                            skip = 1;
                        }
                    }
                    (Scope::Done, _) => {
                        return Err(malformed("content after the root element".to_string()));
                    }
                    (_, other) => {
                        debug!(
                            element = %String::from_utf8_lossy(other),
                            file = %path.display(),
                            "skipping unknown element"
                        );
                        if is_start {
                            skip = 1;
                        }
                    }
                }
            }
            Event::End(_) => {
                if skip > 0 {
                    skip -= 1;
                    continue;
                }
                scope = match std::mem::replace(&mut scope, Scope::Done) {
                    Scope::Package(entry) => {
                        set.packages.push(entry);
                        Scope::Packages
                    }
                    _ => Scope::Done,
                };
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match scope {
        Scope::Done => Ok(set),
        Scope::Document => Err(ConfigError::malformed(
            path,
            0,
            "missing root element 'packages'",
        )),
        Scope::Packages | Scope::Package(_) => Err(ConfigError::malformed(
            path,
            content.len() as u64,
            "unexpected end of document",
        )),
    }
}

/// Collect the attributes of an element as (name, unescaped value) pairs.
fn attributes(element: &BytesStart<'_>) -> std::result::Result<Vec<(Vec<u8>, String)>, String> {
    element
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(|e| format!("invalid attribute: {e}"))?;
            let value = attr
                .unescape_value()
                .map_err(|e| format!("invalid attribute value: {e}"))?;
            Ok((attr.key.as_ref().to_vec(), value.into_owned()))
        })
        .collect()
}

fn required_id(attrs: &[(Vec<u8>, String)], element: &str) -> std::result::Result<String, String> {
    attrs
        .iter()
        .find(|(k, _)| k == b"id")
        .map(|(_, v)| v.clone())
        .ok_or_else(|| format!("missing attribute 'id' on <{element}>"))
}

fn read_package(element: &BytesStart<'_>) -> std::result::Result<RequirementEntry, String> {
    let attrs = attributes(element)?;
    let raw_id = required_id(&attrs, "package")?;
    let id = PackageId::parse(&raw_id).ok_or_else(|| format!("invalid package id '{raw_id}'"))?;
    let mut entry = RequirementEntry::new(id);

    for (key, value) in &attrs {
        match key.as_slice() {
            b"version" => {
                let version = Version::parse(value)
                    .ok_or_else(|| format!("invalid version '{value}' for '{raw_id}'"))?;
                entry.version = Some(version);
            }
            b"allowedVersions" => {
                let range = VersionRange::parse(value)
                    .ok_or_else(|| format!("invalid range '{value}' for '{raw_id}'"))?;
                entry.allowed_versions = range;
            }
            b"targetFramework" => {
                entry.platform = Some(PlatformMoniker::parse(value));
            }
            b"developmentDependency" => {
                entry.development = parse_bool(value).ok_or_else(|| {
                    format!("developmentDependency must be true or false, got '{value}'")
                })?;
            }
            _ => {}
        }
    }

    Ok(entry)
}

fn read_ignore(element: &BytesStart<'_>) -> std::result::Result<IgnoreMatcher, String> {
    let attrs = attributes(element)?;
    Ok(IgnoreMatcher::new(required_id(&attrs, "ignore")?))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// A declaration file together with what it declares.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// File the set was read from.
    pub path: PathBuf,
    /// Declared requirements.
    pub requirements: RequirementSet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn parse(xml: &str) -> Result<RequirementSet> {
        parse_declaration(xml, Path::new("NuGetPackages.xml"))
    }

    #[test]
    fn full_declaration() {
        let set = parse(
            r#"<?xml version="1.0" encoding="utf-8"?>
            <packages>
              <package id="A" version="2.0.0" allowedVersions="[1.0,3.0)"
                       targetFramework="netstandard2.0" developmentDependency="true">
                <ignore id="A.Internal.*"/>
              </package>
              <package id="B"/>
              <ignore id="System.*"/>
            </packages>"#,
        )
        .unwrap();

        assert_eq!(set.packages.len(), 2);
        let a = &set.packages[0];
        assert_eq!(a.id.as_str(), "A");
        assert_eq!(a.version, Version::parse("2.0.0"));
        assert_eq!(a.allowed_versions, VersionRange::parse("[1.0,3.0)").unwrap());
        assert_eq!(a.platform, Some(PlatformMoniker::parse("netstandard2.0")));
        assert!(a.development);
        assert_eq!(a.ignores, vec![IgnoreMatcher::new("A.Internal.*")]);

        let b = &set.packages[1];
        assert_eq!(b.allowed_versions, VersionRange::all_stable());
        assert!(b.version.is_none());
        assert!(!b.development);

        assert_eq!(set.ignores, vec![IgnoreMatcher::new("System.*")]);
    }

    #[test]
    fn empty_root() {
        assert!(parse("<packages/>").unwrap().is_empty());
        assert!(parse("<packages></packages>").unwrap().is_empty());
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let set = parse(
            r#"<packages>
                 <comment><package id="Hidden"/></comment>
                 <package id="A"><note>text</note></package>
               </packages>"#,
        )
        .unwrap();
        assert_eq!(set.packages.len(), 1);
        assert_eq!(set.packages[0].id.as_str(), "A");
    }

    #[test]
    fn escaped_attribute_values() {
        let set = parse(r#"<packages><ignore id="A&amp;B"/></packages>"#).unwrap();
        assert_eq!(set.ignores[0].pattern(), "A&B");
    }

    #[test_case("<package id=\"A\"/>" ; "wrong root")]
    #[test_case("<packages><package version=\"1.0\"/></packages>" ; "missing id")]
    #[test_case("<packages><ignore/></packages>" ; "ignore without id")]
    #[test_case("<packages><package id=\"A\" version=\"one\"/></packages>" ; "bad version")]
    #[test_case("<packages><package id=\"A\" allowedVersions=\"[2.0\"/></packages>" ; "bad range")]
    #[test_case("<packages><package id=\"A\" developmentDependency=\"maybe\"/></packages>" ; "bad bool")]
    #[test_case("<packages><package id=\"A\">" ; "unterminated")]
    #[test_case("" ; "empty document")]
    #[test_case("<packages/><packages/>" ; "two roots")]
    fn malformed(xml: &str) {
        assert!(matches!(
            parse(xml),
            Err(ConfigError::MalformedDeclaration { .. })
        ));
    }

    #[test]
    fn error_carries_file_and_position() {
        let err = parse("<packages>\n  <package version=\"1.0\"/>\n</packages>").unwrap_err();
        match err {
            ConfigError::MalformedDeclaration {
                path,
                position,
                message,
            } => {
                assert_eq!(path, PathBuf::from("NuGetPackages.xml"));
                assert!(position > 0);
                assert!(message.contains("missing attribute 'id'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_package_id_has_its_own_code() {
        let err = parse(r#"<packages><package id="A B"/></packages>"#).unwrap_err();
        let core: nuresolve_core::Error = err.into();
        assert_eq!(core.code(), nuresolve_core::ErrorCode::E0104);
    }

    #[test]
    fn read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NuGetPackages.xml");
        std::fs::write(&path, r#"<packages><package id="A"/></packages>"#).unwrap();
        let set = read_declaration_file(&path).unwrap();
        assert_eq!(set.len(), 1);
    }
}
