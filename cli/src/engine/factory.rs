use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::engine::client::{ConstructionError, EngineClient, ProbeError};
use crate::engine::{ApiVersion, VersionSet};

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

pub type Result<T> = std::result::Result<T, FactoryError>;

/// Builds an engine client for one endpoint and API version.
pub trait ClientConstructor: Send + Sync {
    type Client: EngineClient;

    fn construct(
        &self,
        endpoint: &str,
        version: ApiVersion,
    ) -> std::result::Result<Self::Client, ConstructionError>;
}

/// Hands out one probed client per API version, building each on first use.
///
/// A client is cached only after it has been constructed and has answered a
/// ping. Failed attempts leave the cache untouched, so the next request for
/// the same version starts over.
pub struct VersionedClientFactory<C: ClientConstructor> {
    endpoint: String,
    versions: VersionSet,
    constructor: C,
    clients: Mutex<HashMap<ApiVersion, Arc<C::Client>>>,
}

impl<C: ClientConstructor> VersionedClientFactory<C> {
    pub fn new(endpoint: impl Into<String>, constructor: C) -> Self {
        Self::with_versions(endpoint, VersionSet::known(), constructor)
    }

    pub fn with_versions(
        endpoint: impl Into<String>,
        versions: VersionSet,
        constructor: C,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            versions,
            constructor,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn default_version(&self) -> ApiVersion {
        self.versions.default_version()
    }

    pub fn known_versions(&self) -> &VersionSet {
        &self.versions
    }

    pub fn default_client(&self) -> Result<Arc<C::Client>> {
        self.client(self.versions.default_version())
    }

    /// Returns the cached client for `version`, or constructs and pings a new one.
    ///
    /// The cache lock is held across construction and ping, so concurrent
    /// callers asking for the same version construct it at most once.
    pub fn client(&self, version: ApiVersion) -> Result<Arc<C::Client>> {
        let mut clients = self.lock_clients();
        if let Some(client) = clients.get(&version) {
            return Ok(Arc::clone(client));
        }

        debug!(%version, endpoint = %self.endpoint, "Constructing engine client");
        let client = self.constructor.construct(&self.endpoint, version)?;

        if let Err(e) = client.ping() {
            warn!(%version, endpoint = %self.endpoint, error = %e, "Engine client failed ping");
            return Err(e.into());
        }

        let client = Arc::new(client);
        clients.insert(version, Arc::clone(&client));
        info!(%version, endpoint = %self.endpoint, "Engine client ready");
        Ok(client)
    }

    /// Tries every known version in ascending order and returns those that
    /// construct and answer a ping. Failures are skipped, never returned.
    pub fn find_available_versions(&self) -> Vec<ApiVersion> {
        let available: Vec<ApiVersion> = self
            .versions
            .iter()
            .filter(|&version| match self.client(version) {
                Ok(_) => true,
                Err(e) => {
                    debug!(%version, error = %e, "API version unavailable");
                    false
                }
            })
            .collect();

        info!(
            endpoint = %self.endpoint,
            available = available.len(),
            known = self.versions.versions().len(),
            "Version discovery finished"
        );
        available
    }

    /// Versions with a cached client, ascending.
    pub fn cached_versions(&self) -> Vec<ApiVersion> {
        let mut versions: Vec<ApiVersion> = self.lock_clients().keys().copied().collect();
        versions.sort();
        versions
    }

    fn lock_clients(&self) -> MutexGuard<'_, HashMap<ApiVersion, Arc<C::Client>>> {
        // Entries are inserted only after a successful ping, so a panicking
        // constructor can never leave a half-built entry behind.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
