//! The endpoint registry: one filesystem per endpoint, plus dispatch.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kvfs_core::{
    ByteChannel, DirectoryFilter, Endpoint, Error, FileAttributes, FileSystem, FsConfig, Mount,
    OpenOptions, Path, StoreCapacity,
};

use crate::uri::{parse_uri, ParsedUri};
use crate::BackendFactory;

/// The URI scheme served by [`Registry::redis`].
pub const REDIS_SCHEME: &str = "redis";

/// Maps endpoints to their filesystems and routes path operations to them.
///
/// Creation is strict: asking to create a filesystem for an endpoint that
/// already has an open one fails with [`Error::AlreadyExists`]. Lookups
/// never create. Closing through the registry releases the pool and drops
/// the entry, so the endpoint can be created again afterwards.
///
/// The registry is safe to share between threads. Pools are opened outside
/// the registry lock, so a slow or unreachable endpoint does not block
/// operations on other endpoints.
///
/// # Example
///
/// ```rust
/// use kvfs_core::OpenOptions;
/// use kvfs_provider::{MemoryFactory, Registry};
///
/// let registry = Registry::new("redis", MemoryFactory::new());
/// registry.resolve_or_create("redis://localhost:6379").unwrap();
///
/// let song = registry.path_from_uri("redis://localhost:6379/music/song1").unwrap();
/// let mut channel = registry
///     .open_channel(&song, &OpenOptions::new().write(true).create(true))
///     .unwrap();
/// channel.write_chunk(b"a,b,c").unwrap();
///
/// assert!(registry.check_exists(&song).unwrap());
/// ```
pub struct Registry<F: BackendFactory> {
    scheme: String,
    factory: F,
    config: FsConfig,
    filesystems: RwLock<HashMap<Endpoint, Arc<FileSystem>>>,
}

#[cfg(feature = "redis")]
impl Registry<crate::RedisFactory> {
    /// A registry serving `redis://` URIs against real servers.
    pub fn redis() -> Self {
        Self::new(REDIS_SCHEME, crate::RedisFactory)
    }
}

impl<F: BackendFactory> Registry<F> {
    pub fn new(scheme: impl Into<String>, factory: F) -> Self {
        Self {
            scheme: scheme.into(),
            factory,
            config: FsConfig::default(),
            filesystems: RwLock::new(HashMap::new()),
        }
    }

    /// Use `config` for filesystems created without an explicit config.
    #[must_use]
    pub fn with_config(mut self, config: FsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Endpoint, Arc<FileSystem>>> {
        self.filesystems
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Endpoint, Arc<FileSystem>>> {
        self.filesystems
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn parse(&self, uri: &str) -> Result<ParsedUri, Error> {
        let parsed = parse_uri(uri, self.factory.default_port())?;
        if parsed.scheme != self.scheme {
            return Err(Error::UnsupportedScheme {
                found: parsed.scheme,
                expected: self.scheme.clone(),
            });
        }
        Ok(parsed)
    }

    /// Create the filesystem for the endpoint named by `uri`, using the
    /// registry's default config.
    ///
    /// The URI path becomes the filesystem's key prefix.
    pub fn resolve_or_create(&self, uri: &str) -> Result<Arc<FileSystem>, Error> {
        self.resolve_or_create_with(uri, self.config.clone())
    }

    /// Create the filesystem for the endpoint named by `uri` with `config`.
    ///
    /// A `key_prefix` in `config` overrides the URI path.
    pub fn resolve_or_create_with(
        &self,
        uri: &str,
        config: FsConfig,
    ) -> Result<Arc<FileSystem>, Error> {
        config.validate()?;
        let parsed = self.parse(uri)?;
        let endpoint = parsed.endpoint;

        if self.read().get(&endpoint).is_some_and(|fs| fs.is_open()) {
            return Err(Error::AlreadyExists { endpoint });
        }

        let pool = self.factory.connect(&endpoint, &config)?;
        let prefix = match &config.key_prefix {
            Some(prefix) => prefix.clone(),
            None => parsed.segments.join("/"),
        };
        let mount = Mount::new(self.scheme.clone(), endpoint.clone(), &prefix);
        let fs = Arc::new(FileSystem::new(mount, pool, config));

        let mut filesystems = self.write();
        if filesystems.get(&endpoint).is_some_and(|fs| fs.is_open()) {
            // Another thread created it while our pool was opening.
            fs.close();
            return Err(Error::AlreadyExists { endpoint });
        }
        log::debug!("Registered filesystem {}", fs);
        filesystems.insert(endpoint, Arc::clone(&fs));
        Ok(fs)
    }

    /// The existing filesystem for the endpoint named by `uri`.
    pub fn lookup(&self, uri: &str) -> Result<Arc<FileSystem>, Error> {
        let parsed = self.parse(uri)?;
        self.filesystem(&parsed.endpoint)
    }

    /// The existing filesystem for `endpoint`.
    pub fn filesystem(&self, endpoint: &Endpoint) -> Result<Arc<FileSystem>, Error> {
        self.read()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| Error::FileSystemNotFound {
                endpoint: endpoint.clone(),
            })
    }

    /// Turn a full URI into a path on its (already created) filesystem.
    ///
    /// The URI path must start with the filesystem's key prefix; the
    /// returned path is relative to that prefix and marked absolute.
    pub fn path_from_uri(&self, uri: &str) -> Result<Path, Error> {
        let parsed = self.parse(uri)?;
        let fs = self.filesystem(&parsed.endpoint)?;
        let rest = parsed
            .segments
            .strip_prefix(fs.mount().prefix())
            .ok_or_else(|| Error::InvalidPath {
                message: format!("{} is outside the key prefix of {}", uri, fs),
            })?;
        Ok(Path::new(
            Arc::clone(fs.mount()),
            &format!("/{}", rest.join("/")),
        ))
    }

    fn owner(&self, path: &Path) -> Result<Arc<FileSystem>, Error> {
        self.filesystem(path.endpoint())
    }

    fn same_endpoint(src: &Path, dst: &Path) -> Result<(), Error> {
        if src.endpoint() == dst.endpoint() {
            Ok(())
        } else {
            Err(Error::CrossEndpoint {
                from: src.endpoint().clone(),
                to: dst.endpoint().clone(),
            })
        }
    }

    pub fn open_channel(&self, path: &Path, options: &OpenOptions) -> Result<ByteChannel, Error> {
        self.owner(path)?.open_channel(path, options)
    }

    pub fn list_directory(
        &self,
        dir: &Path,
        filter: Option<&dyn DirectoryFilter>,
    ) -> Result<BTreeSet<Path>, Error> {
        self.owner(dir)?.matching_keys(dir, filter)
    }

    pub fn delete(&self, path: &Path) -> Result<(), Error> {
        self.owner(path)?.delete(path)
    }

    /// Copy within one endpoint. Returns `false` if `src` did not exist.
    pub fn copy(&self, src: &Path, dst: &Path) -> Result<bool, Error> {
        Self::same_endpoint(src, dst)?;
        self.owner(src)?.copy(src, dst)
    }

    /// Move within one endpoint, atomically.
    pub fn move_path(&self, src: &Path, dst: &Path) -> Result<(), Error> {
        Self::same_endpoint(src, dst)?;
        self.owner(src)?.rename(src, dst)
    }

    pub fn check_exists(&self, path: &Path) -> Result<bool, Error> {
        self.owner(path)?.exists(path)
    }

    pub fn check_access(&self, path: &Path) -> Result<(), Error> {
        self.owner(path)?.check_access(path)
    }

    pub fn read_attributes(&self, path: &Path) -> Result<FileAttributes, Error> {
        self.owner(path)?.read_attributes(path)
    }

    /// Capacity of the endpoint holding `path`.
    pub fn capacity(&self, path: &Path) -> Result<StoreCapacity, Error> {
        self.owner(path)?.capacity()
    }

    /// Directories exist only as key prefixes.
    pub fn create_directory(&self, _dir: &Path) -> Result<(), Error> {
        Err(Error::unsupported("create_directory"))
    }

    pub fn read_symbolic_link(&self, _link: &Path) -> Result<Path, Error> {
        Err(Error::unsupported("read_symbolic_link"))
    }

    /// Close the filesystem for the endpoint named by `uri` and forget it.
    pub fn close(&self, uri: &str) -> Result<(), Error> {
        let parsed = self.parse(uri)?;
        let fs = self
            .write()
            .remove(&parsed.endpoint)
            .ok_or(Error::FileSystemNotFound {
                endpoint: parsed.endpoint,
            })?;
        fs.close();
        Ok(())
    }

    /// Close every filesystem.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.write().drain().map(|(_, fs)| fs).collect();
        for fs in drained {
            fs.close();
        }
    }

    /// Registered endpoints, sorted.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut endpoints: Vec<_> = self.read().keys().cloned().collect();
        endpoints.sort();
        endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryFactory;

    fn registry() -> Registry<MemoryFactory> {
        Registry::new(REDIS_SCHEME, MemoryFactory::new())
    }

    #[test]
    fn create_then_lookup() {
        let registry = registry();
        let fs = registry.resolve_or_create("redis://localhost:6379").unwrap();
        let found = registry.lookup("redis://localhost:6379/any/path").unwrap();
        assert!(Arc::ptr_eq(&fs, &found));
        assert_eq!(registry.endpoints(), vec![Endpoint::new("localhost", 6379)]);
    }

    #[test]
    fn default_port_applies() {
        let registry = registry();
        registry.resolve_or_create("redis://localhost").unwrap();
        assert!(registry.lookup("redis://localhost:6379").is_ok());
    }

    #[test]
    fn strict_create() {
        let registry = registry();
        registry.resolve_or_create("redis://localhost:6379").unwrap();
        let err = registry
            .resolve_or_create("redis://localhost:6379/other")
            .err()
            .unwrap();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn wrong_scheme() {
        let registry = registry();
        let err = registry.resolve_or_create("http://localhost:6379").err().unwrap();
        assert!(matches!(
            err,
            Error::UnsupportedScheme { found, .. } if found == "http"
        ));
    }

    #[test]
    fn lookup_never_creates() {
        let registry = registry();
        let err = registry.lookup("redis://localhost:6379").err().unwrap();
        assert!(matches!(err, Error::FileSystemNotFound { .. }));
        assert!(registry.path_from_uri("redis://localhost:6379/a").is_err());
        assert!(registry.endpoints().is_empty());
    }

    #[test]
    fn uri_path_becomes_prefix() {
        let registry = registry();
        let fs = registry
            .resolve_or_create("redis://localhost:6379/archive")
            .unwrap();
        assert_eq!(fs.mount().prefix(), ["archive"]);

        let p = registry
            .path_from_uri("redis://localhost:6379/archive/music/song1")
            .unwrap();
        assert_eq!(p.key(), "music/song1");
        assert_eq!(p.content_key(), "archive/music/song1");
        assert_eq!(
            p.to_absolute_string(),
            "redis://localhost:6379/archive/music/song1"
        );

        assert!(matches!(
            registry.path_from_uri("redis://localhost:6379/music/song1"),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn config_prefix_overrides_uri() {
        let registry = registry();
        let config = FsConfig {
            key_prefix: Some("lts".to_string()),
            ..FsConfig::default()
        };
        let fs = registry
            .resolve_or_create_with("redis://localhost:6379/archive", config)
            .unwrap();
        assert_eq!(fs.mount().prefix(), ["lts"]);
    }

    #[test]
    fn invalid_config_rejected() {
        let registry = registry();
        let config = FsConfig {
            max_connections: 0,
            ..FsConfig::default()
        };
        assert!(registry
            .resolve_or_create_with("redis://localhost:6379", config)
            .is_err());
        assert!(registry.endpoints().is_empty());
    }

    #[test]
    fn close_allows_recreate() {
        let registry = registry();
        let fs = registry.resolve_or_create("redis://localhost:6379").unwrap();
        registry.close("redis://localhost:6379").unwrap();

        assert!(!fs.is_open());
        assert!(registry.lookup("redis://localhost:6379").is_err());
        assert!(registry.close("redis://localhost:6379").is_err());

        let again = registry.resolve_or_create("redis://localhost:6379").unwrap();
        assert!(again.is_open());
    }

    #[test]
    fn directly_closed_filesystem_is_replaced() {
        let registry = registry();
        let fs = registry.resolve_or_create("redis://localhost:6379").unwrap();
        fs.close();

        let p = fs.path("a", &[]);
        assert!(matches!(
            registry.check_exists(&p),
            Err(Error::Closed { .. })
        ));

        let again = registry.resolve_or_create("redis://localhost:6379").unwrap();
        assert!(!Arc::ptr_eq(&fs, &again));
        assert!(registry.check_exists(&p).is_ok());
    }

    #[test]
    fn close_all_empties_registry() {
        let registry = registry();
        let a = registry.resolve_or_create("redis://a:6379").unwrap();
        let b = registry.resolve_or_create("redis://b:6379").unwrap();
        registry.close_all();

        assert!(!a.is_open());
        assert!(!b.is_open());
        assert!(registry.endpoints().is_empty());
    }

    #[test]
    fn unsupported_directory_operations() {
        let registry = registry();
        let fs = registry.resolve_or_create("redis://localhost:6379").unwrap();
        let dir = fs.path("music", &[]);
        assert!(matches!(
            registry.create_directory(&dir),
            Err(Error::Unsupported { .. })
        ));
        assert!(matches!(
            registry.read_symbolic_link(&dir),
            Err(Error::Unsupported { .. })
        ));
    }
}
