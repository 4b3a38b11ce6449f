//! Core traits for the backend layer.

use std::sync::Arc;
use std::time::Duration;

use crate::{KvError, MemoryInfo};

/// The primitive command set a kvfs backend must offer.
///
/// Every method is a single round trip against one endpoint. Keys are opaque
/// strings and values are opaque bytes; nothing at this level knows about
/// paths or directories.
///
/// # Object Safety
///
/// This trait is object-safe: pools hand out `Box<dyn KvConnection>`.
pub trait KvConnection: Send {
    /// Read a whole value. `Ok(None)` if the key does not exist.
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Replace a whole value, creating the key if needed.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Store `value` only if `key` does not exist, as one command.
    ///
    /// Returns `true` if the value was stored. An existing key of any type
    /// is left untouched.
    fn set_if_absent(&mut self, key: &str, value: &[u8]) -> Result<bool, KvError>;

    /// Read the bytes in `start..=end`.
    ///
    /// Out-of-range bounds are clamped to the value; an absent key or a
    /// range that starts past the end yields an empty vector.
    fn get_range(&mut self, key: &str, start: u64, end: u64) -> Result<Vec<u8>, KvError>;

    /// Overwrite bytes starting at `offset`, growing the value as needed.
    ///
    /// Any gap between the old end and `offset` is zero-filled. Returns the
    /// length of the value after the write. Writing an empty slice never
    /// creates the key.
    fn set_range(&mut self, key: &str, offset: u64, value: &[u8]) -> Result<u64, KvError>;

    /// Length of the value in bytes; 0 for an absent key.
    fn strlen(&mut self, key: &str) -> Result<u64, KvError>;

    fn exists(&mut self, key: &str) -> Result<bool, KvError>;

    /// Whether `key` holds a hash rather than a string.
    fn is_hash(&mut self, key: &str) -> Result<bool, KvError>;

    /// Delete keys, returning how many existed.
    fn delete(&mut self, keys: &[&str]) -> Result<u64, KvError>;

    /// Enumerate keys matching a backend glob pattern (`*`, `?`, `[...]`,
    /// backslash escapes). No ordering is guaranteed.
    fn scan_keys(&mut self, pattern: &str) -> Result<Vec<String>, KvError>;

    /// Atomically rename `src` to `dst`, replacing `dst` if it exists.
    ///
    /// Fails with [`KvError::NoSuchKey`] when `src` does not exist.
    fn rename(&mut self, src: &str, dst: &str) -> Result<(), KvError>;

    /// Copy the value of `src` to `dst` in one indivisible backend-side step.
    ///
    /// Returns `false` if `src` did not exist, in which case `dst` is removed.
    fn copy_value(&mut self, src: &str, dst: &str) -> Result<bool, KvError>;

    /// Read one field of a hash stored at `key`.
    fn hash_get(&mut self, key: &str, field: &str) -> Result<Option<String>, KvError>;

    /// Memory statistics reported by the backend.
    fn memory_info(&mut self) -> Result<MemoryInfo, KvError>;
}

/// A connection checked out of a pool. Dropping it releases the connection.
pub type PooledConnection = Box<dyn KvConnection>;

/// A source of scoped connections to one backend endpoint.
pub trait ConnectionPool: Send + Sync {
    /// Check out a connection for the duration of one logical operation.
    fn connection(&self) -> Result<PooledConnection, KvError>;
}

/// Sizing and timeout settings for a connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub max_size: u32,
    pub connection_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 8,
            connection_timeout: Duration::from_secs(2),
        }
    }
}

// Blanket implementations for boxes and shared pools

impl<T: KvConnection + ?Sized> KvConnection for Box<T> {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        self.as_mut().get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.as_mut().set(key, value)
    }

    fn set_if_absent(&mut self, key: &str, value: &[u8]) -> Result<bool, KvError> {
        self.as_mut().set_if_absent(key, value)
    }

    fn get_range(&mut self, key: &str, start: u64, end: u64) -> Result<Vec<u8>, KvError> {
        self.as_mut().get_range(key, start, end)
    }

    fn set_range(&mut self, key: &str, offset: u64, value: &[u8]) -> Result<u64, KvError> {
        self.as_mut().set_range(key, offset, value)
    }

    fn strlen(&mut self, key: &str) -> Result<u64, KvError> {
        self.as_mut().strlen(key)
    }

    fn exists(&mut self, key: &str) -> Result<bool, KvError> {
        self.as_mut().exists(key)
    }

    fn is_hash(&mut self, key: &str) -> Result<bool, KvError> {
        self.as_mut().is_hash(key)
    }

    fn delete(&mut self, keys: &[&str]) -> Result<u64, KvError> {
        self.as_mut().delete(keys)
    }

    fn scan_keys(&mut self, pattern: &str) -> Result<Vec<String>, KvError> {
        self.as_mut().scan_keys(pattern)
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<(), KvError> {
        self.as_mut().rename(src, dst)
    }

    fn copy_value(&mut self, src: &str, dst: &str) -> Result<bool, KvError> {
        self.as_mut().copy_value(src, dst)
    }

    fn hash_get(&mut self, key: &str, field: &str) -> Result<Option<String>, KvError> {
        self.as_mut().hash_get(key, field)
    }

    fn memory_info(&mut self) -> Result<MemoryInfo, KvError> {
        self.as_mut().memory_info()
    }
}

impl<T: ConnectionPool + ?Sized> ConnectionPool for Arc<T> {
    fn connection(&self) -> Result<PooledConnection, KvError> {
        self.as_ref().connection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryKv;

    #[test]
    fn object_safety_works() {
        let kv = MemoryKv::new();
        let pool: &dyn ConnectionPool = &kv;

        let mut conn = pool.connection().unwrap();
        conn.set("test", b"data").unwrap();
        assert_eq!(conn.get("test").unwrap(), Some(b"data".to_vec()));
    }

    #[test]
    fn arc_blanket_impl_works() {
        let kv: Arc<dyn ConnectionPool> = Arc::new(MemoryKv::new());
        let shared = Arc::clone(&kv);

        shared.connection().unwrap().set("arc", b"value").unwrap();
        assert!(kv.connection().unwrap().exists("arc").unwrap());
    }

    #[test]
    fn box_blanket_impl_works() {
        let kv = MemoryKv::new();
        let mut boxed: Box<PooledConnection> = Box::new(kv.connection().unwrap());

        boxed.set_range("boxed", 2, b"xy").unwrap();
        assert_eq!(boxed.get("boxed").unwrap(), Some(b"\0\0xy".to_vec()));
    }

    #[test]
    fn default_pool_options() {
        let options = PoolOptions::default();
        assert_eq!(options.max_size, 8);
        assert_eq!(options.connection_timeout, Duration::from_secs(2));
    }
}
