//! Ignore rules: glob-like package id patterns.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Matches package ids against a pattern where `*` stands for any sequence
/// of characters. Matching is anchored and case-insensitive.
#[derive(Clone)]
pub struct IgnoreMatcher {
    pattern: String,
    regex: Option<Regex>,
}

impl IgnoreMatcher {
    /// Compile a pattern. Never fails.
    ///
    /// ```
    /// use nuresolve_core::IgnoreMatcher;
    ///
    /// let matcher = IgnoreMatcher::new("Foo.*");
    /// assert!(matcher.is_match("foo.bar"));
    /// assert!(!matcher.is_match("Bar.Foo"));
    /// ```
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let source = format!("^{}$", regex::escape(&pattern).replace(r"\*", ".*"));
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| {
                tracing::debug!(pattern = %pattern, error = %e, "ignore pattern falls back to literal match");
            })
            .ok();
        Self { pattern, regex }
    }

    /// Check if the whole id matches.
    #[must_use]
    pub fn is_match(&self, id: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(id),
            None => self.pattern.eq_ignore_ascii_case(id),
        }
    }

    /// The pattern as written.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for IgnoreMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IgnoreMatcher").field(&self.pattern).finish()
    }
}

impl fmt::Display for IgnoreMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

impl PartialEq for IgnoreMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for IgnoreMatcher {}

impl Serialize for IgnoreMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pattern)
    }
}

impl<'de> Deserialize<'de> for IgnoreMatcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(String::deserialize(deserializer)?))
    }
}

/// Check whether any matcher in the list matches `id`.
#[must_use]
pub fn any_match<'a>(matchers: impl IntoIterator<Item = &'a IgnoreMatcher>, id: &str) -> bool {
    matchers.into_iter().any(|m| m.is_match(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Foo.Bar", true ; "suffix wildcard")]
    #[test_case("Foo.", true ; "empty wildcard")]
    #[test_case("foo.bar", true ; "case insensitive")]
    #[test_case("Bar.Foo", false ; "no partial match")]
    #[test_case("Foo", false ; "dot is literal")]
    #[test_case("FooXBar", false ; "dot is not any char")]
    fn wildcard_pattern(id: &str, expected: bool) {
        assert_eq!(IgnoreMatcher::new("Foo.*").is_match(id), expected);
    }

    #[test]
    fn no_wildcard_is_exact() {
        let matcher = IgnoreMatcher::new("System.Memory");
        assert!(matcher.is_match("system.memory"));
        assert!(!matcher.is_match("System.Memory.Data"));
        assert!(!matcher.is_match("My.System.Memory"));
    }

    #[test]
    fn metacharacters_are_literal() {
        let matcher = IgnoreMatcher::new("A+(B)[c]?");
        assert!(matcher.is_match("a+(b)[C]?"));
        assert!(!matcher.is_match("AA(B)c"));
    }

    #[test]
    fn inner_wildcards() {
        let matcher = IgnoreMatcher::new("*.Internal.*");
        assert!(matcher.is_match("Company.Internal.Tools"));
        assert!(!matcher.is_match("Company.Public.Tools"));
    }

    #[test]
    fn star_matches_everything() {
        let matcher = IgnoreMatcher::new("*");
        assert!(matcher.is_match(""));
        assert!(matcher.is_match("Anything.At.All"));
    }

    #[test]
    fn any_match_checks_every_matcher() {
        let matchers = [IgnoreMatcher::new("A"), IgnoreMatcher::new("B.*")];
        assert!(any_match(&matchers, "b.c"));
        assert!(!any_match(&matchers, "C"));
    }
}
