use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::version::{ApiVersion, VersionSet};

/// Outcome of one discovery sweep against an engine endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub endpoint: String,
    pub default_version: ApiVersion,
    pub known_versions: Vec<ApiVersion>,
    /// Versions that constructed and answered a ping, in ascending order.
    pub available_versions: Vec<ApiVersion>,
    pub checked_at: DateTime<Utc>,
}

impl DiscoveryReport {
    pub fn new(
        endpoint: impl Into<String>,
        versions: &VersionSet,
        available_versions: Vec<ApiVersion>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            default_version: versions.default_version(),
            known_versions: versions.versions().to_vec(),
            available_versions,
            checked_at: Utc::now(),
        }
    }

    pub fn default_available(&self) -> bool {
        self.available_versions.contains(&self.default_version)
    }

    /// Newest version the engine accepted, if any.
    pub fn newest_available(&self) -> Option<ApiVersion> {
        self.available_versions.last().copied()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
