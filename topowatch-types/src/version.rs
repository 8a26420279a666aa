//! Version stamp of the cycle report layout.
//!
//! Sinks key off record field names and graph extension keys, so the stamp
//! follows what they can observe:
//!
//! - a new optional record field, a new `arc__*` / `detail__*` key or a new
//!   projection bumps the minor version; older sinks skip what they don't know
//! - renaming or retyping a field, or changing what an existing extension key
//!   means, bumps the major version
//!
//! With the `serde` feature the stamp is written as the string `"1.0"`.

use std::fmt;
use std::str::FromStr;

use crate::SCHEMA_VERSION;

/// Minor layout version written by this library.
pub const SCHEMA_MINOR: u32 = 0;

/// Layout version of a cycle report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

impl SchemaVersion {
    /// The layout written by this library.
    pub const CURRENT: Self = Self::new(SCHEMA_VERSION, SCHEMA_MINOR);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether a reader built for `self` can consume a report stamped
    /// `report`, skipping keys it does not know.
    pub fn can_read(&self, report: SchemaVersion) -> bool {
        self.major == report.major
    }

    /// Whether a reader built for `self` knows every key of a report stamped
    /// `report`.
    pub fn reads_fully(&self, report: SchemaVersion) -> bool {
        self.can_read(report) && self.minor >= report.minor
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A version stamp that is not `<major>` or `<major>.<minor>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSchemaVersionError(String);

impl fmt::Display for ParseSchemaVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid schema version {:?}", self.0)
    }
}

impl std::error::Error for ParseSchemaVersionError {}

impl FromStr for SchemaVersion {
    type Err = ParseSchemaVersionError;

    /// A bare major version reads as minor 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseSchemaVersionError(s.to_string());
        let (major, minor) = match s.trim().split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s.trim(), "0"),
        };
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = ParseSchemaVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchemaVersion> for String {
    fn from(version: SchemaVersion) -> Self {
        version.to_string()
    }
}
