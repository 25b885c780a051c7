//! Engine API versioning.
//!
//! The container engine exposes its HTTP API under a version prefix
//! (`/v1.18/...`). Older and newer prefixes are not guaranteed to be
//! compatible with each other, so berth talks to the engine through one
//! client per version.
//!
//! # Known Versions
//!
//! | Version | Engine release |
//! |---------|----------------|
//! | 1.17 | 1.5 |
//! | 1.18 | 1.6 |
//! | 1.19 | 1.7 |
//! | 1.20 | 1.8 |
//! | 1.21 | 1.9 |
//! | 1.22 | 1.10 |
//! | 1.23 | 1.11 |
//! | 1.24 | 1.12 |
//!
//! # Adding a Version
//!
//! 1. Append it to `KNOWN_VERSIONS` (the list must stay ascending)
//! 2. Leave `DEFAULT_VERSION` alone unless the oldest supported engine moves

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One engine API version, written `<major>.<minor>`.
///
/// Ordering is numeric, so `1.9 < 1.17`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    major: u16,
    minor: u16,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub const fn major(&self) -> u16 {
        self.major
    }

    pub const fn minor(&self) -> u16 {
        self.minor
    }

    /// URL path prefix for this version, e.g. `/v1.18`.
    pub fn path_prefix(&self) -> String {
        format!("/v{}", self)
    }

    pub fn is_known(&self) -> bool {
        KNOWN_VERSIONS.contains(self)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseVersionError {
    #[error("empty API version")]
    Empty,

    #[error("API version {0:?} is not of the form <major>.<minor>")]
    Format(String),
}

impl FromStr for ApiVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseVersionError::Empty);
        }
        let s = s.strip_prefix('v').unwrap_or(s);

        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| ParseVersionError::Format(s.to_string()))?;
        let major = major
            .parse()
            .map_err(|_| ParseVersionError::Format(s.to_string()))?;
        let minor = minor
            .parse()
            .map_err(|_| ParseVersionError::Format(s.to_string()))?;

        Ok(Self { major, minor })
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

pub const VERSION_1_17: ApiVersion = ApiVersion::new(1, 17);
pub const VERSION_1_18: ApiVersion = ApiVersion::new(1, 18);
pub const VERSION_1_19: ApiVersion = ApiVersion::new(1, 19);
pub const VERSION_1_20: ApiVersion = ApiVersion::new(1, 20);
pub const VERSION_1_21: ApiVersion = ApiVersion::new(1, 21);
pub const VERSION_1_22: ApiVersion = ApiVersion::new(1, 22);
pub const VERSION_1_23: ApiVersion = ApiVersion::new(1, 23);
pub const VERSION_1_24: ApiVersion = ApiVersion::new(1, 24);

/// Every API version berth is willing to try, ascending.
pub const KNOWN_VERSIONS: &[ApiVersion] = &[
    VERSION_1_17,
    VERSION_1_18,
    VERSION_1_19,
    VERSION_1_20,
    VERSION_1_21,
    VERSION_1_22,
    VERSION_1_23,
    VERSION_1_24,
];

/// Version used when the caller does not ask for one.
/// Pinned to the oldest known version, which every supported engine accepts.
pub const DEFAULT_VERSION: ApiVersion = VERSION_1_17;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionSetError {
    #[error("version set must contain at least one version")]
    Empty,

    #[error("default version {0} is not in the version set")]
    DefaultNotListed(ApiVersion),
}

/// An ascending, de-duplicated list of API versions with a designated default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSet {
    versions: Vec<ApiVersion>,
    default: ApiVersion,
}

impl VersionSet {
    pub fn new(
        versions: impl IntoIterator<Item = ApiVersion>,
        default: ApiVersion,
    ) -> Result<Self, VersionSetError> {
        let mut versions: Vec<ApiVersion> = versions.into_iter().collect();
        versions.sort();
        versions.dedup();

        if versions.is_empty() {
            return Err(VersionSetError::Empty);
        }
        if versions.binary_search(&default).is_err() {
            return Err(VersionSetError::DefaultNotListed(default));
        }

        Ok(Self { versions, default })
    }

    /// The built-in `KNOWN_VERSIONS` with `DEFAULT_VERSION`.
    pub fn known() -> Self {
        Self {
            versions: KNOWN_VERSIONS.to_vec(),
            default: DEFAULT_VERSION,
        }
    }

    pub fn default_version(&self) -> ApiVersion {
        self.default
    }

    pub fn versions(&self) -> &[ApiVersion] {
        &self.versions
    }

    pub fn contains(&self, version: ApiVersion) -> bool {
        self.versions.binary_search(&version).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = ApiVersion> + '_ {
        self.versions.iter().copied()
    }
}

impl Default for VersionSet {
    fn default() -> Self {
        Self::known()
    }
}
