//! BagIt version parsing and the rules each version switches on.

use crate::error::{BagError, BagResult};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A `major.minor` BagIt version, ordered numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const V0_96: Version = Version::new(0, 96);
    pub const V0_97: Version = Version::new(0, 97);
    pub const V1_0: Version = Version::new(1, 0);

    /// Version written for newly created bags.
    pub const CURRENT: Version = Version::V1_0;

    /// Versions this library reads and writes.
    pub const SUPPORTED: [Version; 3] = [Version::V0_96, Version::V0_97, Version::V1_0];

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse `"<int>.<int>"`. Anything else is an error.
    pub fn parse(value: &str) -> BagResult<Self> {
        let invalid = || BagError::InvalidVersion {
            value: value.to_string(),
        };
        let (major, minor) = value.trim().split_once('.').ok_or_else(invalid)?;
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(major) || !digits(minor) {
            return Err(invalid());
        }
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }

    /// Parse and require a supported version.
    pub fn parse_supported(value: &str) -> BagResult<Self> {
        let version = Self::parse(value)?;
        if !version.is_supported() {
            return Err(BagError::UnsupportedVersion {
                value: version.to_string(),
            });
        }
        Ok(version)
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }

    /// Three-way comparison as -1, 0 or 1.
    pub fn compare(&self, other: &Version) -> i32 {
        match self.cmp(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// `-` as a fetch length ("unknown") is accepted from 0.97.
    pub fn allows_unknown_fetch_length(&self) -> bool {
        *self >= Self::V0_97
    }

    /// Manifest and fetch paths are percent-encoded from 1.0.
    pub fn percent_encodes_paths(&self) -> bool {
        *self >= Self::V1_0
    }

    /// From 1.0 a BOM in `bagit.txt` is an error instead of a warning.
    pub fn forbids_bom(&self) -> bool {
        *self >= Self::V1_0
    }

    /// From 1.0 tag manifests are expected to cover every payload manifest.
    pub fn expects_manifests_in_tag_manifest(&self) -> bool {
        *self >= Self::V1_0
    }

    /// From 1.0 tag names must not carry surrounding whitespace.
    pub fn strict_tag_names(&self) -> bool {
        *self >= Self::V1_0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
