mod types;
mod version;

pub use types::DiscoveryReport;
pub use version::{
    ApiVersion, ParseVersionError, VersionSet, VersionSetError, DEFAULT_VERSION, KNOWN_VERSIONS,
    VERSION_1_17, VERSION_1_18, VERSION_1_19, VERSION_1_20, VERSION_1_21, VERSION_1_22,
    VERSION_1_23, VERSION_1_24,
};
