//! In-process backend with the same command semantics as the Redis backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::pattern::pattern_to_regex;
use crate::{ConnectionPool, KvConnection, KvError, MemoryInfo, PooledConnection};

/// Largest value a string key may grow to (matches Redis' 512 MiB limit).
pub const MAX_VALUE_LEN: u64 = 512 * 1024 * 1024;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Default)]
struct State {
    strings: HashMap<String, Vec<u8>>,
    hashes: HashMap<String, BTreeMap<String, String>>,
    maxmemory: u64,
    total_system_memory: u64,
    unavailable: bool,
}

impl State {
    fn string(&self, key: &str) -> Result<Option<&Vec<u8>>, KvError> {
        if self.hashes.contains_key(key) {
            return Err(KvError::command(WRONGTYPE));
        }
        Ok(self.strings.get(key))
    }

    fn string_mut(&mut self, key: &str) -> Result<&mut Vec<u8>, KvError> {
        if self.hashes.contains_key(key) {
            return Err(KvError::command(WRONGTYPE));
        }
        Ok(self.strings.entry(key.to_string()).or_default())
    }

    fn remove(&mut self, key: &str) -> bool {
        let string = self.strings.remove(key).is_some();
        let hash = self.hashes.remove(key).is_some();
        string || hash
    }

    fn contains(&self, key: &str) -> bool {
        self.strings.contains_key(key) || self.hashes.contains_key(key)
    }
}

/// A thread-safe in-memory key/value backend.
///
/// Clones share the same keyspace, the way every connection to one server
/// sees the same data. `MemoryKv` is its own [`ConnectionPool`]; each
/// connection it hands out is a cheap handle onto the shared state, and
/// every command runs under a single lock, so each command is atomic.
///
/// # Example
///
/// ```rust
/// use kvfs_kv_store::{ConnectionPool, MemoryKv};
///
/// let kv = MemoryKv::new();
/// let mut conn = kv.connection().unwrap();
/// conn.set_range("log", 0, b"abc").unwrap();
/// conn.set_range("log", 3, b"def").unwrap();
/// assert_eq!(conn.get("log").unwrap(), Some(b"abcdef".to_vec()));
/// ```
#[derive(Clone, Default)]
pub struct MemoryKv {
    state: Arc<Mutex<State>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that reports the given memory limits from `memory_info`.
    pub fn with_memory_limits(maxmemory: u64, total_system_memory: u64) -> Self {
        let kv = Self::new();
        {
            let mut state = kv.lock();
            state.maxmemory = maxmemory;
            state.total_system_memory = total_system_memory;
        }
        kv
    }

    /// Set a field on the hash stored at `key`, creating the hash if needed.
    ///
    /// kvfs never writes hashes itself; this stands in for the external
    /// writer of attribute keys.
    pub fn set_hash_field(&self, key: &str, field: &str, value: &str) -> Result<(), KvError> {
        let mut state = self.lock();
        if state.strings.contains_key(key) {
            return Err(KvError::command(WRONGTYPE));
        }
        state
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let state = self.lock();
        let keys: BTreeSet<&String> = state.strings.keys().chain(state.hashes.keys()).collect();
        keys.into_iter().cloned().collect()
    }

    /// Simulate an unreachable server: every later checkout and command fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state for one command, failing if the backend is "down".
    fn command(&self) -> Result<MutexGuard<'_, State>, KvError> {
        let state = self.lock();
        if state.unavailable {
            return Err(KvError::Connection(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "in-memory backend marked unavailable",
            ))));
        }
        Ok(state)
    }
}

impl ConnectionPool for MemoryKv {
    fn connection(&self) -> Result<PooledConnection, KvError> {
        if self.lock().unavailable {
            return Err(KvError::Pool {
                message: "in-memory backend marked unavailable".to_string(),
            });
        }
        Ok(Box::new(self.clone()))
    }
}

impl KvConnection for MemoryKv {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let state = self.command()?;
        Ok(state.string(key)?.cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let mut state = self.command()?;
        state.hashes.remove(key);
        state.strings.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn set_if_absent(&mut self, key: &str, value: &[u8]) -> Result<bool, KvError> {
        let mut state = self.command()?;
        if state.contains(key) {
            return Ok(false);
        }
        state.strings.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn get_range(&mut self, key: &str, start: u64, end: u64) -> Result<Vec<u8>, KvError> {
        let state = self.command()?;
        let Some(value) = state.string(key)? else {
            return Ok(Vec::new());
        };
        let len = value.len() as u64;
        if len == 0 || start >= len || start > end {
            return Ok(Vec::new());
        }
        let end = end.min(len - 1);
        Ok(value[start as usize..=end as usize].to_vec())
    }

    fn set_range(&mut self, key: &str, offset: u64, value: &[u8]) -> Result<u64, KvError> {
        let mut state = self.command()?;
        if value.is_empty() {
            return Ok(state.string(key)?.map_or(0, |v| v.len() as u64));
        }
        let end = offset
            .checked_add(value.len() as u64)
            .filter(|end| *end <= MAX_VALUE_LEN)
            .ok_or_else(|| KvError::command("string exceeds maximum allowed size"))?;

        let stored = state.string_mut(key)?;
        if (stored.len() as u64) < end {
            stored.resize(end as usize, 0);
        }
        stored[offset as usize..end as usize].copy_from_slice(value);
        Ok(stored.len() as u64)
    }

    fn strlen(&mut self, key: &str) -> Result<u64, KvError> {
        let state = self.command()?;
        Ok(state.string(key)?.map_or(0, |v| v.len() as u64))
    }

    fn exists(&mut self, key: &str) -> Result<bool, KvError> {
        Ok(self.command()?.contains(key))
    }

    fn is_hash(&mut self, key: &str) -> Result<bool, KvError> {
        Ok(self.command()?.hashes.contains_key(key))
    }

    fn delete(&mut self, keys: &[&str]) -> Result<u64, KvError> {
        let mut state = self.command()?;
        Ok(keys.iter().filter(|key| state.remove(key)).count() as u64)
    }

    fn scan_keys(&mut self, pattern: &str) -> Result<Vec<String>, KvError> {
        let matcher = pattern_to_regex(pattern)?;
        let state = self.command()?;
        Ok(state
            .strings
            .keys()
            .chain(state.hashes.keys())
            .filter(|key| matcher.is_match(key))
            .cloned()
            .collect())
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<(), KvError> {
        let mut state = self.command()?;
        if !state.contains(src) {
            return Err(KvError::NoSuchKey {
                key: src.to_string(),
            });
        }
        if src == dst {
            return Ok(());
        }
        state.remove(dst);
        if let Some(value) = state.strings.remove(src) {
            state.strings.insert(dst.to_string(), value);
        }
        if let Some(fields) = state.hashes.remove(src) {
            state.hashes.insert(dst.to_string(), fields);
        }
        Ok(())
    }

    fn copy_value(&mut self, src: &str, dst: &str) -> Result<bool, KvError> {
        let mut state = self.command()?;
        let value = state.string(src)?.cloned();
        match value {
            Some(value) => {
                state.hashes.remove(dst);
                state.strings.insert(dst.to_string(), value);
                Ok(true)
            }
            None => {
                state.remove(dst);
                Ok(false)
            }
        }
    }

    fn hash_get(&mut self, key: &str, field: &str) -> Result<Option<String>, KvError> {
        let state = self.command()?;
        if state.strings.contains_key(key) {
            return Err(KvError::command(WRONGTYPE));
        }
        Ok(state.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    fn memory_info(&mut self) -> Result<MemoryInfo, KvError> {
        let state = self.command()?;
        let strings: usize = state.strings.iter().map(|(k, v)| k.len() + v.len()).sum();
        let hashes: usize = state
            .hashes
            .iter()
            .map(|(k, h)| k.len() + h.iter().map(|(f, v)| f.len() + v.len()).sum::<usize>())
            .sum();
        Ok(MemoryInfo {
            used_memory: (strings + hashes) as u64,
            maxmemory: state.maxmemory,
            total_system_memory: state.total_system_memory,
        })
    }
}
