//! Backend factories: how a registry turns an endpoint into a pool.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use kvfs_core::{Endpoint, Error, FsConfig};
use kvfs_kv_store::{ConnectionPool, MemoryKv};

/// Creates connection pools for endpoints.
pub trait BackendFactory: Send + Sync {
    /// Port assumed when a URI names none.
    fn default_port(&self) -> u16;

    /// Open a pool for `endpoint`.
    fn connect(
        &self,
        endpoint: &Endpoint,
        config: &FsConfig,
    ) -> Result<Arc<dyn ConnectionPool>, Error>;
}

/// Connects to real Redis servers.
#[cfg(feature = "redis")]
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisFactory;

#[cfg(feature = "redis")]
impl BackendFactory for RedisFactory {
    fn default_port(&self) -> u16 {
        6379
    }

    fn connect(
        &self,
        endpoint: &Endpoint,
        config: &FsConfig,
    ) -> Result<Arc<dyn ConnectionPool>, Error> {
        let pool = kvfs_kv_store::RedisPool::connect(
            endpoint.host(),
            endpoint.port(),
            &config.pool_options(),
        )?;
        Ok(Arc::new(pool))
    }
}

/// Serves every endpoint from an in-process [`MemoryKv`].
///
/// Data for an endpoint outlives the filesystems created for it, the way a
/// server's keys survive a client reconnecting. Clones share the same set
/// of backends.
#[derive(Clone, Default)]
pub struct MemoryFactory {
    backends: Arc<Mutex<HashMap<Endpoint, MemoryKv>>>,
}

impl MemoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backend behind `endpoint`, created empty on first use.
    pub fn backend(&self, endpoint: &Endpoint) -> MemoryKv {
        self.backends
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(endpoint.clone())
            .or_default()
            .clone()
    }
}

impl BackendFactory for MemoryFactory {
    fn default_port(&self) -> u16 {
        6379
    }

    fn connect(
        &self,
        endpoint: &Endpoint,
        _config: &FsConfig,
    ) -> Result<Arc<dyn ConnectionPool>, Error> {
        Ok(Arc::new(self.backend(endpoint)))
    }
}
