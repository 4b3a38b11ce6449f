//! Low-level kvfs backend layer.
//!
//! This is the narrow waist of the kvfs stack. Everything at this level is a
//! raw key/value primitive against one backend endpoint - no paths, no
//! directories, no file semantics.
//!
//! - `KvConnection`: the primitive command set (get/set, range reads and
//!   writes, existence, deletion, pattern scans, rename, server-side copy,
//!   hash field reads and memory introspection)
//! - `ConnectionPool`: hands out scoped connections; dropping the handle
//!   returns the connection to the pool
//! - `MemoryKv`: an in-process backend with the same semantics, for tests
//! - `RedisPool` (feature `redis`): a pooled Redis backend
//!
//! # Example
//!
//! ```rust
//! use kvfs_kv_store::{ConnectionPool, KvError, MemoryKv};
//!
//! fn greet(pool: &dyn ConnectionPool) -> Result<Option<Vec<u8>>, KvError> {
//!     let mut conn = pool.connection()?;
//!     conn.set("greeting", b"hello")?;
//!     conn.get("greeting")
//! }
//!
//! let kv = MemoryKv::new();
//! assert_eq!(greet(&kv).unwrap(), Some(b"hello".to_vec()));
//! ```

mod error;
mod info;
mod memory;
mod pattern;
mod traits;

#[cfg(feature = "redis")]
mod redis_pool;

pub use error::KvError;
pub use info::MemoryInfo;
pub use memory::{MemoryKv, MAX_VALUE_LEN};
pub use pattern::escape_pattern;
pub use traits::{ConnectionPool, KvConnection, PoolOptions, PooledConnection};

#[cfg(feature = "redis")]
pub use redis_pool::RedisPool;
