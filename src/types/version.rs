//! Dotted-numeric version strings.
//!
//! Chart versions are strings of two or more dot-separated decimal
//! components, e.g. `"1.0"` or `"2.3.1"`. The format is validated on
//! construction so a `Version` held anywhere in the crate is always
//! well-formed.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+(\.\d+)+$").expect("version pattern is valid"))
}

/// A validated dotted-numeric version string.
///
/// Deliberately not `Ord`: string order does not agree with numeric
/// component order ("10.0" sorts before "2.0").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Version(String);

/// Error for malformed version strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed version string: {0:?} (expected dotted-numeric, e.g. \"1.0\")")]
pub struct VersionError(pub String);

impl Version {
    /// Parse and validate a version string.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        if version_pattern().is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(VersionError(s.to_string()))
        }
    }

    /// The version every new chart starts at.
    pub fn initial() -> Self {
        Self("1.0".to_string())
    }

    /// Get the version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return a new version with the last component incremented.
    ///
    /// `"1.0"` becomes `"1.1"`, `"2.3.9"` becomes `"2.3.10"`.
    pub fn bump_minor(&self) -> Self {
        let mut parts: Vec<String> = self.0.split('.').map(str::to_string).collect();
        if let Some(last) = parts.last_mut() {
            let n: u64 = last.parse().unwrap_or(0);
            *last = (n + 1).to_string();
        }
        Self(parts.join("."))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}
