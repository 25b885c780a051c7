mod client;
mod factory;

pub use berth_protocol::{ApiVersion, DiscoveryReport, VersionSet};
#[cfg(test)]
pub use berth_protocol::{DEFAULT_VERSION, VERSION_1_17, VERSION_1_18, VERSION_1_19, VERSION_1_20};
pub use client::{EngineClient, SocketConstructor};
pub use factory::VersionedClientFactory;

use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "unix:///var/run/docker.sock";

pub type EngineFactory = VersionedClientFactory<SocketConstructor>;

/// Factory for the local engine socket at `endpoint`.
pub fn socket_factory(endpoint: &str, versions: VersionSet, timeout: Duration) -> EngineFactory {
    VersionedClientFactory::with_versions(endpoint, versions, SocketConstructor::new(timeout))
}
