//! A filesystem over one backend endpoint.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use kvfs_kv_store::{escape_pattern, ConnectionPool, KvConnection};

use crate::attributes::parse_millis;
use crate::{
    ByteChannel, DirectoryFilter, Endpoint, Error, FileAttributes, FsConfig, Mount, OpenOptions,
    Path, PathMatcher, StoreCapacity, ATTRIBUTE_TAG, KEY_CREATION_TIME, LAST_ACCESSED_TIME,
    LAST_MODIFIED_TIME,
};

/// File operations over the keys of one endpoint.
///
/// A `FileSystem` owns the connection pool for its endpoint. Each operation
/// checks out one connection for the duration of that call and returns it
/// on every exit path, error paths included. No locks are held across
/// backend calls, so operations from many threads run concurrently and rely
/// on the backend's own single-command atomicity.
///
/// Directories are not stored anywhere. Listing a directory scans for keys
/// that start with its key followed by `/`; nested keys come back as flat
/// entries (`music/a/b` lists as `a/b` under `music`).
///
/// After [`close`](FileSystem::close) the pool is released and every
/// operation fails with [`Error::Closed`].
pub struct FileSystem {
    mount: Arc<Mount>,
    config: FsConfig,
    pool: RwLock<Option<Arc<dyn ConnectionPool>>>,
}

impl FileSystem {
    pub fn new(mount: Mount, pool: Arc<dyn ConnectionPool>, config: FsConfig) -> Self {
        log::debug!("Opened filesystem {}", mount.uri_base());
        Self {
            mount: Arc::new(mount),
            config,
            pool: RwLock::new(Some(pool)),
        }
    }

    pub fn mount(&self) -> &Arc<Mount> {
        &self.mount
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.mount.endpoint()
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn is_read_only(&self) -> bool {
        false
    }

    pub fn separator(&self) -> &'static str {
        "/"
    }

    /// Build a path from segments joined with `/`.
    pub fn path(&self, first: &str, more: &[&str]) -> Path {
        let mut key = first.to_string();
        for segment in more {
            key.push('/');
            key.push_str(segment);
        }
        Path::new(Arc::clone(&self.mount), &key)
    }

    /// The absolute root path, which lists the whole prefix.
    pub fn root(&self) -> Path {
        Path::new(Arc::clone(&self.mount), "/")
    }

    pub fn path_matcher(&self, syntax_and_pattern: &str) -> Result<PathMatcher, Error> {
        PathMatcher::parse(syntax_and_pattern)
    }

    fn closed(&self) -> Error {
        Error::Closed {
            resource: self.to_string(),
        }
    }

    /// Run `op` with a connection checked out for exactly this call.
    pub(crate) fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut dyn KvConnection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let pool = self
            .pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| self.closed())?;
        let mut conn = pool.connection()?;
        op(&mut *conn)
    }

    fn ensure_local(&self, path: &Path) -> Result<(), Error> {
        if path.endpoint() == self.endpoint() {
            Ok(())
        } else {
            Err(Error::CrossEndpoint {
                from: path.endpoint().clone(),
                to: self.endpoint().clone(),
            })
        }
    }

    /// Whether the content key exists. The attribute key is not consulted.
    pub fn exists(&self, path: &Path) -> Result<bool, Error> {
        self.ensure_local(path)?;
        let key = path.content_key();
        self.with_connection(|conn| Ok(conn.exists(&key)?))
    }

    /// Fail with [`Error::NoSuchKey`] unless the content key exists.
    pub fn check_access(&self, path: &Path) -> Result<(), Error> {
        if self.exists(path)? {
            Ok(())
        } else {
            Err(Error::NoSuchKey {
                key: path.content_key(),
            })
        }
    }

    /// Remove the content key and its attribute key. Missing keys are fine.
    pub fn delete(&self, path: &Path) -> Result<(), Error> {
        self.ensure_local(path)?;
        let key = path.content_key();
        let attrs = path.attribute_key();
        let removed =
            self.with_connection(|conn| Ok(conn.delete(&[key.as_str(), attrs.as_str()])?))?;
        log::debug!("Deleted {} ({} keys removed)", key, removed);
        Ok(())
    }

    /// Atomically rename `src` to `dst`, replacing `dst`.
    pub fn rename(&self, src: &Path, dst: &Path) -> Result<(), Error> {
        self.ensure_local(src)?;
        self.ensure_local(dst)?;
        let from = src.content_key();
        let to = dst.content_key();
        self.with_connection(|conn| Ok(conn.rename(&from, &to)?))?;
        log::debug!("Renamed {} to {}", from, to);
        Ok(())
    }

    /// Copy `src` to `dst` in one backend-side step.
    ///
    /// Returns `false` when `src` did not exist; `dst` is then removed so it
    /// never holds a stale value.
    pub fn copy(&self, src: &Path, dst: &Path) -> Result<bool, Error> {
        self.ensure_local(src)?;
        self.ensure_local(dst)?;
        let from = src.content_key();
        let to = dst.content_key();
        let copied = self.with_connection(|conn| Ok(conn.copy_value(&from, &to)?))?;
        if copied {
            log::debug!("Copied {} to {}", from, to);
        } else {
            log::warn!("Copy source {} does not exist, removed {}", from, to);
        }
        Ok(copied)
    }

    pub fn read_attributes(&self, path: &Path) -> Result<FileAttributes, Error> {
        self.ensure_local(path)?;
        let key = path.content_key();
        let attr_key = path.attribute_key();

        let found = self.with_connection(|conn| {
            if !conn.exists(&key)? {
                return Ok(None);
            }
            let size = conn.strlen(&key)?;
            let modified = conn.hash_get(&attr_key, LAST_MODIFIED_TIME)?;
            let accessed = conn.hash_get(&attr_key, LAST_ACCESSED_TIME)?;
            let created = conn.hash_get(&attr_key, KEY_CREATION_TIME)?;
            Ok(Some((size, modified, accessed, created)))
        })?;

        let mut attrs = FileAttributes {
            exists: false,
            size: 0,
            last_modified_ms: 0,
            last_accessed_ms: 0,
            created_ms: 0,
            file_key: path.to_absolute_string(),
        };
        if let Some((size, modified, accessed, created)) = found {
            attrs.exists = true;
            attrs.size = size;
            attrs.last_modified_ms = parse_millis(&attr_key, LAST_MODIFIED_TIME, modified);
            attrs.last_accessed_ms = parse_millis(&attr_key, LAST_ACCESSED_TIME, accessed);
            attrs.created_ms = parse_millis(&attr_key, KEY_CREATION_TIME, created);
        }
        Ok(attrs)
    }

    /// The whole value of `path`.
    pub fn read_all(&self, path: &Path) -> Result<Vec<u8>, Error> {
        self.ensure_local(path)?;
        let key = path.content_key();
        self.with_connection(|conn| {
            conn.get(&key)?
                .ok_or_else(|| Error::NoSuchKey { key: key.clone() })
        })
    }

    /// Replace the whole value of `path`.
    pub fn write_all(&self, path: &Path, bytes: &[u8]) -> Result<(), Error> {
        self.ensure_local(path)?;
        let key = path.content_key();
        self.with_connection(|conn| Ok(conn.set(&key, bytes)?))
    }

    /// List the entries under `dir`, sorted.
    ///
    /// When `filter` is given, each entry is offered to it. A filter error
    /// is logged and the entry left out; it never fails the listing.
    pub fn matching_keys(
        &self,
        dir: &Path,
        filter: Option<&dyn DirectoryFilter>,
    ) -> Result<BTreeSet<Path>, Error> {
        self.ensure_local(dir)?;
        let dir_key = dir.content_key();
        // The unprefixed root is the only listing that can see attribute keys.
        let at_root = dir_key.is_empty();
        let (pattern, strip) = if at_root {
            ("*".to_string(), String::new())
        } else {
            (
                format!("{}/*", escape_pattern(&dir_key)),
                format!("{}/", dir_key),
            )
        };

        let keys = self.with_connection(|conn| {
            let keys = conn.scan_keys(&pattern)?;
            if !at_root {
                return Ok(keys);
            }
            let scanned: HashSet<&str> = keys.iter().map(String::as_str).collect();
            let mut visible = Vec::with_capacity(keys.len());
            for key in &keys {
                if !is_attribute_key(conn, key, &scanned)? {
                    visible.push(key.clone());
                }
            }
            Ok(visible)
        })?;

        let mut entries = BTreeSet::new();
        for key in keys {
            let Some(suffix) = key.strip_prefix(&strip) else {
                continue;
            };
            let suffix = suffix.trim_start_matches('/');
            if suffix.is_empty() {
                continue;
            }

            let entry = dir.join(suffix);
            // Paths cannot hold empty segments, so `a//b` or `a/` would name another key.
            if entry.content_key() != key {
                log::warn!("Skipping key {} with empty path segments", key);
                continue;
            }
            match filter.map_or(Ok(true), |f| f.accept(&entry)) {
                Ok(true) => {
                    entries.insert(entry);
                }
                Ok(false) => {}
                Err(e) => log::error!("Directory filter failed on {}, excluding it: {}", key, e),
            }
        }
        Ok(entries)
    }

    /// Open a byte channel on `path`.
    pub fn open_channel(
        self: &Arc<Self>,
        path: &Path,
        options: &OpenOptions,
    ) -> Result<ByteChannel, Error> {
        options.validate()?;
        self.ensure_local(path)?;
        let key = path.content_key();

        let position = self.with_connection(|conn| {
            if options.is_write() {
                if options.creates_new() {
                    if !conn.set_if_absent(&key, b"")? {
                        return Err(Error::KeyExists { key: key.clone() });
                    }
                } else if options.creates() {
                    if options.truncates() {
                        conn.set(&key, b"")?;
                    } else {
                        conn.set_if_absent(&key, b"")?;
                    }
                } else if !conn.exists(&key)? {
                    return Err(Error::NoSuchKey { key: key.clone() });
                } else if options.truncates() {
                    conn.set(&key, b"")?;
                }
            } else if !conn.exists(&key)? {
                return Err(Error::NoSuchKey { key: key.clone() });
            }

            if options.is_append() {
                Ok(conn.strlen(&key)?)
            } else {
                Ok(0)
            }
        })?;

        Ok(ByteChannel::new(
            Arc::clone(self),
            path.clone(),
            key,
            position,
            options,
        ))
    }

    /// Advisory capacity from the backend's memory report.
    pub fn capacity(&self) -> Result<StoreCapacity, Error> {
        let info = self.with_connection(|conn| Ok(conn.memory_info()?))?;
        Ok(StoreCapacity::from_memory_info(&info, &self.config))
    }

    pub fn usable_space(&self) -> Result<u64, Error> {
        Ok(self.capacity()?.usable())
    }

    pub fn total_space(&self) -> Result<u64, Error> {
        Ok(self.capacity()?.total)
    }

    pub fn root_directories(&self) -> Result<Vec<Path>, Error> {
        Err(Error::unsupported("root_directories"))
    }

    /// Key changes are not observable through this filesystem.
    pub fn watch(&self, _dir: &Path) -> Result<(), Error> {
        Err(Error::unsupported("watch"))
    }

    /// Attribute keys are maintained outside kvfs.
    pub fn set_attribute(&self, _path: &Path, _name: &str, _value: &str) -> Result<(), Error> {
        Err(Error::unsupported("set_attribute"))
    }

    /// Release the connection pool. Closing twice is a no-op.
    pub fn close(&self) {
        let released = self
            .pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            log::debug!("Closed filesystem {}", self);
        }
    }
}

/// Whether a root-level key is the attribute record of another key.
///
/// `Attrs<key>` is one when `<key>` was scanned too, or when it holds a
/// hash; a plain string that happens to start with the tag is a file.
fn is_attribute_key(
    conn: &mut dyn KvConnection,
    key: &str,
    scanned: &HashSet<&str>,
) -> Result<bool, Error> {
    let Some(target) = key.strip_prefix(ATTRIBUTE_TAG) else {
        return Ok(false);
    };
    if scanned.contains(target) {
        return Ok(true);
    }
    Ok(conn.is_hash(key)?)
}

impl fmt::Display for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mount.uri_base())
    }
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("mount", &self.mount)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvfs_kv_store::{KvError, MemoryInfo, MemoryKv, PooledConnection};

    fn setup(prefix: &str) -> (Arc<FileSystem>, MemoryKv) {
        let kv = MemoryKv::new();
        let mount = Mount::new("redis", Endpoint::new("localhost", 6379), prefix);
        let fs = FileSystem::new(mount, Arc::new(kv.clone()), FsConfig::default());
        (Arc::new(fs), kv)
    }

    fn keys(entries: &BTreeSet<Path>) -> Vec<String> {
        entries.iter().map(Path::key).collect()
    }

    #[test]
    fn path_building() {
        let (fs, _kv) = setup("");
        let p = fs.path("music", &["pink_floyd", "time"]);
        assert_eq!(p.content_key(), "music/pink_floyd/time");
        assert_eq!(fs.separator(), "/");
        assert!(!fs.is_read_only());
        assert_eq!(fs.to_string(), "redis://localhost:6379");
    }

    #[test]
    fn exists_ignores_attribute_key() {
        let (fs, kv) = setup("");
        let p = fs.path("a", &[]);
        kv.set_hash_field("Attrsa", LAST_MODIFIED_TIME, "1").unwrap();
        assert!(!fs.exists(&p).unwrap());

        fs.write_all(&p, b"x").unwrap();
        assert!(fs.exists(&p).unwrap());
        assert!(fs.check_access(&p).is_ok());
        assert!(matches!(
            fs.check_access(&fs.path("b", &[])),
            Err(Error::NoSuchKey { .. })
        ));
    }

    #[test]
    fn delete_removes_both_keys_and_is_idempotent() {
        let (fs, kv) = setup("");
        let p = fs.path("music", &["song1"]);
        fs.write_all(&p, b"data").unwrap();
        kv.set_hash_field("Attrsmusic/song1", LAST_MODIFIED_TIME, "5").unwrap();

        fs.delete(&p).unwrap();
        assert!(kv.keys().is_empty());
        fs.delete(&p).unwrap();

        // An orphaned attribute key still goes.
        kv.set_hash_field("Attrsmusic/song1", LAST_MODIFIED_TIME, "5").unwrap();
        fs.delete(&p).unwrap();
        assert!(kv.keys().is_empty());
    }

    #[test]
    fn rename_moves_content() {
        let (fs, _kv) = setup("");
        let src = fs.path("music", &["song1"]);
        let dst = fs.path("music", &["song3"]);
        fs.write_all(&src, b"abc").unwrap();

        fs.rename(&src, &dst).unwrap();
        assert!(!fs.exists(&src).unwrap());
        assert_eq!(fs.read_all(&dst).unwrap(), b"abc");
    }

    #[test]
    fn rename_missing_source() {
        let (fs, _kv) = setup("");
        let err = fs
            .rename(&fs.path("nope", &[]), &fs.path("dst", &[]))
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchKey { key } if key == "nope"));
    }

    #[test]
    fn copy_is_independent() {
        let (fs, _kv) = setup("");
        let src = fs.path("src", &[]);
        let dst = fs.path("dst", &[]);
        fs.write_all(&src, b"abc").unwrap();

        assert!(fs.copy(&src, &dst).unwrap());
        fs.write_all(&dst, b"changed").unwrap();
        assert_eq!(fs.read_all(&src).unwrap(), b"abc");
    }

    #[test]
    fn copy_missing_source_removes_destination() {
        let (fs, _kv) = setup("");
        let dst = fs.path("dst", &[]);
        fs.write_all(&dst, b"stale").unwrap();

        assert!(!fs.copy(&fs.path("src", &[]), &dst).unwrap());
        assert!(!fs.exists(&dst).unwrap());
    }

    #[test]
    fn read_attributes_defaults_missing_fields() {
        let (fs, kv) = setup("");
        let p = fs.path("music", &["song1"]);
        fs.write_all(&p, b"12345").unwrap();
        kv.set_hash_field("Attrsmusic/song1", LAST_MODIFIED_TIME, "1700000000000")
            .unwrap();
        kv.set_hash_field("Attrsmusic/song1", KEY_CREATION_TIME, "garbage")
            .unwrap();

        let attrs = fs.read_attributes(&p).unwrap();
        assert!(attrs.exists);
        assert!(attrs.is_regular_file());
        assert_eq!(attrs.size, 5);
        assert_eq!(attrs.last_modified_ms, 1_700_000_000_000);
        assert_eq!(attrs.last_accessed_ms, 0);
        assert_eq!(attrs.created_ms, 0);
        assert_eq!(attrs.file_key, "redis://localhost:6379/music/song1");
    }

    #[test]
    fn read_attributes_of_missing_key() {
        let (fs, kv) = setup("");
        kv.set_hash_field("Attrsghost", LAST_MODIFIED_TIME, "9").unwrap();

        let attrs = fs.read_attributes(&fs.path("ghost", &[])).unwrap();
        assert!(!attrs.exists);
        assert_eq!(attrs.size, 0);
        assert_eq!(attrs.last_modified_ms, 0);
    }

    #[test]
    fn read_all_missing_key() {
        let (fs, _kv) = setup("");
        assert!(fs.read_all(&fs.path("nope", &[])).unwrap_err().is_not_found());
    }

    #[test]
    fn listing_strips_prefix_and_sorts() {
        let (fs, _kv) = setup("");
        for name in ["song2", "song1", "pink_floyd/time"] {
            fs.write_all(&fs.path("music", &[name]), b"").unwrap();
        }
        fs.write_all(&fs.path("musical", &[]), b"").unwrap();
        fs.write_all(&fs.path("video", &["clip"]), b"").unwrap();

        let dir = fs.path("music", &[]);
        let entries = fs.matching_keys(&dir, None).unwrap();
        assert_eq!(
            keys(&entries),
            vec!["music/pink_floyd/time", "music/song1", "music/song2"]
        );
        assert!(entries.iter().all(|p| p.starts_with(&dir)));
    }

    #[test]
    fn listing_with_prefix() {
        let (fs, kv) = setup("archive");
        fs.write_all(&fs.path("music", &["song1"]), b"").unwrap();
        assert_eq!(kv.keys(), vec!["archive/music/song1"]);

        let entries = fs.matching_keys(&fs.root(), None).unwrap();
        assert_eq!(keys(&entries), vec!["music/song1"]);
    }

    #[test]
    fn listing_root_hides_attribute_keys() {
        let (fs, kv) = setup("");
        fs.write_all(&fs.path("a", &[]), b"").unwrap();
        kv.set_hash_field("Attrsa", LAST_MODIFIED_TIME, "1").unwrap();

        let entries = fs.matching_keys(&fs.root(), None).unwrap();
        assert_eq!(keys(&entries), vec!["a"]);
    }

    #[test]
    fn listing_root_keeps_files_named_like_attribute_keys() {
        let (fs, kv) = setup("");
        fs.write_all(&fs.path("Attrsheet.csv", &[]), b"a,b").unwrap();
        fs.write_all(&fs.path("a", &[]), b"").unwrap();
        kv.set_hash_field("Attrsa", LAST_MODIFIED_TIME, "1").unwrap();
        kv.set_hash_field("Attrsorphan", LAST_MODIFIED_TIME, "1").unwrap();

        let entries = fs.matching_keys(&fs.root(), None).unwrap();
        assert_eq!(keys(&entries), vec!["Attrsheet.csv", "a"]);
    }

    #[test]
    fn listing_skips_keys_with_empty_segments() {
        let (fs, kv) = setup("");
        let mut conn = kv.clone();
        for key in ["music/a//b", "music/trailing/", "music//lead", "music/song1"] {
            conn.set(key, b"x").unwrap();
        }

        let dir = fs.path("music", &[]);
        let entries = fs.matching_keys(&dir, None).unwrap();
        assert_eq!(keys(&entries), vec!["music/song1"]);

        for entry in &entries {
            assert!(fs.exists(entry).unwrap());
            fs.delete(entry).unwrap();
        }
        assert!(fs.matching_keys(&dir, None).unwrap().is_empty());
    }

    #[test]
    fn listing_escapes_glob_characters_in_directory() {
        let (fs, _kv) = setup("");
        fs.write_all(&fs.path("dir[1]", &["a"]), b"").unwrap();
        fs.write_all(&fs.path("dir1", &["b"]), b"").unwrap();

        let entries = fs.matching_keys(&fs.path("dir[1]", &[]), None).unwrap();
        assert_eq!(keys(&entries), vec!["dir[1]/a"]);
    }

    #[test]
    fn listing_with_matcher() {
        let (fs, _kv) = setup("");
        for name in ["song1.pb", "song2.pb", "notes.txt"] {
            fs.write_all(&fs.path("music", &[name]), b"").unwrap();
        }
        let matcher = fs.path_matcher("glob:music/*.pb").unwrap();
        let entries = fs
            .matching_keys(&fs.path("music", &[]), Some(&matcher))
            .unwrap();
        assert_eq!(keys(&entries), vec!["music/song1.pb", "music/song2.pb"]);
    }

    #[test]
    fn failing_filter_excludes_entry_only() {
        let (fs, _kv) = setup("");
        for name in ["good", "bad"] {
            fs.write_all(&fs.path("d", &[name]), b"").unwrap();
        }
        let filter = |p: &Path| -> Result<bool, Error> {
            if p.file_name() == Some("bad") {
                Err(Error::invalid_argument("filter blew up"))
            } else {
                Ok(true)
            }
        };
        let entries = fs.matching_keys(&fs.path("d", &[]), Some(&filter)).unwrap();
        assert_eq!(keys(&entries), vec!["d/good"]);
    }

    #[test]
    fn open_requires_existing_key_unless_creating() {
        let (fs, kv) = setup("");
        let p = fs.path("new", &[]);

        assert!(matches!(
            fs.open_channel(&p, &OpenOptions::new()),
            Err(Error::NoSuchKey { .. })
        ));
        assert!(matches!(
            fs.open_channel(&p, &OpenOptions::new().write(true)),
            Err(Error::NoSuchKey { .. })
        ));

        fs.open_channel(&p, &OpenOptions::new().write(true).create(true))
            .unwrap();
        assert_eq!(kv.keys(), vec!["new"]);

        assert!(matches!(
            fs.open_channel(&p, &OpenOptions::new().write(true).create_new(true)),
            Err(Error::KeyExists { .. })
        ));
    }

    /// A backend where another client stores `value` at `key` right after
    /// an `exists` miss or right before a `set_if_absent` on that key.
    #[derive(Clone)]
    struct RacingWriter {
        kv: MemoryKv,
        key: String,
        value: &'static [u8],
    }

    impl RacingWriter {
        fn interfere(&mut self, key: &str) -> Result<(), KvError> {
            if key == self.key {
                self.kv.set(key, self.value)?;
            }
            Ok(())
        }
    }

    impl ConnectionPool for RacingWriter {
        fn connection(&self) -> Result<PooledConnection, KvError> {
            Ok(Box::new(self.clone()))
        }
    }

    impl KvConnection for RacingWriter {
        fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
            self.kv.get(key)
        }
        fn set(&mut self, key: &str, value: &[u8]) -> Result<(), KvError> {
            self.kv.set(key, value)
        }
        fn set_if_absent(&mut self, key: &str, value: &[u8]) -> Result<bool, KvError> {
            self.interfere(key)?;
            self.kv.set_if_absent(key, value)
        }
        fn get_range(&mut self, key: &str, start: u64, end: u64) -> Result<Vec<u8>, KvError> {
            self.kv.get_range(key, start, end)
        }
        fn set_range(&mut self, key: &str, offset: u64, value: &[u8]) -> Result<u64, KvError> {
            self.kv.set_range(key, offset, value)
        }
        fn strlen(&mut self, key: &str) -> Result<u64, KvError> {
            self.kv.strlen(key)
        }
        fn exists(&mut self, key: &str) -> Result<bool, KvError> {
            let found = self.kv.exists(key)?;
            if !found {
                self.interfere(key)?;
            }
            Ok(found)
        }
        fn is_hash(&mut self, key: &str) -> Result<bool, KvError> {
            self.kv.is_hash(key)
        }
        fn delete(&mut self, keys: &[&str]) -> Result<u64, KvError> {
            self.kv.delete(keys)
        }
        fn scan_keys(&mut self, pattern: &str) -> Result<Vec<String>, KvError> {
            self.kv.scan_keys(pattern)
        }
        fn rename(&mut self, src: &str, dst: &str) -> Result<(), KvError> {
            self.kv.rename(src, dst)
        }
        fn copy_value(&mut self, src: &str, dst: &str) -> Result<bool, KvError> {
            self.kv.copy_value(src, dst)
        }
        fn hash_get(&mut self, key: &str, field: &str) -> Result<Option<String>, KvError> {
            self.kv.hash_get(key, field)
        }
        fn memory_info(&mut self) -> Result<MemoryInfo, KvError> {
            self.kv.memory_info()
        }
    }

    fn racing_setup(key: &str) -> (Arc<FileSystem>, MemoryKv) {
        let kv = MemoryKv::new();
        let racer = RacingWriter {
            kv: kv.clone(),
            key: key.to_string(),
            value: b"written by another client",
        };
        let mount = Mount::new("redis", Endpoint::new("localhost", 6379), "");
        let fs = FileSystem::new(mount, Arc::new(racer), FsConfig::default());
        (Arc::new(fs), kv)
    }

    #[test]
    fn open_create_keeps_concurrent_write() {
        let (fs, kv) = racing_setup("log");
        let p = fs.path("log", &[]);

        let ch = fs
            .open_channel(&p, &OpenOptions::new().write(true).create(true))
            .unwrap();
        assert_eq!(ch.size().unwrap(), 25);
        assert_eq!(
            kv.clone().get("log").unwrap(),
            Some(b"written by another client".to_vec())
        );
    }

    #[test]
    fn open_create_new_loses_to_concurrent_write() {
        let (fs, kv) = racing_setup("log");
        let p = fs.path("log", &[]);

        assert!(matches!(
            fs.open_channel(&p, &OpenOptions::new().write(true).create_new(true)),
            Err(Error::KeyExists { .. })
        ));
        assert_eq!(
            kv.clone().get("log").unwrap(),
            Some(b"written by another client".to_vec())
        );
    }

    #[test]
    fn open_create_and_truncate_empties_existing_value() {
        let (fs, _kv) = setup("");
        let p = fs.path("k", &[]);
        fs.write_all(&p, b"old").unwrap();

        fs.open_channel(&p, &OpenOptions::new().write(true).create(true))
            .unwrap();
        assert_eq!(fs.read_all(&p).unwrap(), b"old");

        fs.open_channel(
            &p,
            &OpenOptions::new().write(true).create(true).truncate(true),
        )
        .unwrap();
        assert!(fs.read_all(&p).unwrap().is_empty());
    }

    #[test]
    fn open_with_truncate_empties_value() {
        let (fs, _kv) = setup("");
        let p = fs.path("k", &[]);
        fs.write_all(&p, b"old contents").unwrap();

        let ch = fs
            .open_channel(&p, &OpenOptions::new().write(true).truncate(true))
            .unwrap();
        assert_eq!(ch.size().unwrap(), 0);
    }

    #[test]
    fn capacity_from_memory_report() {
        let kv = MemoryKv::with_memory_limits(0, 16 * 1024 * 1024 * 1024);
        let mount = Mount::new("redis", Endpoint::new("localhost", 6379), "");
        let fs = FileSystem::new(mount, Arc::new(kv), FsConfig::default());

        assert_eq!(fs.total_space().unwrap(), 16 * 1024 * 1024 * 1024);
        assert!(fs.usable_space().unwrap() <= fs.total_space().unwrap());
    }

    #[test]
    fn unsupported_primitives() {
        let (fs, _kv) = setup("");
        assert!(matches!(
            fs.root_directories(),
            Err(Error::Unsupported { .. })
        ));
        assert!(matches!(
            fs.set_attribute(&fs.path("a", &[]), LAST_MODIFIED_TIME, "1"),
            Err(Error::Unsupported { .. })
        ));
        assert!(matches!(fs.watch(&fs.root()), Err(Error::Unsupported { .. })));
    }

    #[test]
    fn foreign_paths_are_rejected() {
        let (fs, _kv) = setup("");
        let other = Arc::new(Mount::new("redis", Endpoint::new("otherhost", 6379), ""));
        let foreign = Path::new(other, "a");
        assert!(matches!(
            fs.exists(&foreign),
            Err(Error::CrossEndpoint { .. })
        ));
    }

    #[test]
    fn close_releases_pool() {
        let (fs, _kv) = setup("");
        let p = fs.path("a", &[]);
        fs.write_all(&p, b"x").unwrap();
        let mut ch = fs.open_channel(&p, &OpenOptions::new()).unwrap();

        fs.close();
        fs.close();
        assert!(!fs.is_open());
        assert!(matches!(fs.exists(&p), Err(Error::Closed { .. })));
        assert!(matches!(ch.read_chunk(1), Err(Error::Closed { .. })));
    }

    #[test]
    fn backend_failures_propagate() {
        let (fs, kv) = setup("");
        kv.set_unavailable(true);
        assert!(matches!(
            fs.exists(&fs.path("a", &[])),
            Err(Error::Backend(_))
        ));
    }
}
