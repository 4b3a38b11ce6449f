//! kvfs: files and directories over a Redis-compatible key/value store.
//!
//! Every file is one value. Its key is the file's path segments joined by
//! `/` under an optional prefix, and its timestamps live in a companion
//! hash. Directories are implicit: listing a directory is a prefix scan.
//!
//! This crate re-exports the layers:
//!
//! - [`backend`]: raw key/value connections (`kvfs-kv-store`)
//! - paths, filesystems and byte channels (`kvfs-core`)
//! - the URI-keyed [`Registry`] (`kvfs-provider`)
//!
//! # Example
//!
//! ```rust
//! use std::io::{Read, Write};
//! use kvfs::{MemoryFactory, OpenOptions, Registry, REDIS_SCHEME};
//!
//! let registry = Registry::new(REDIS_SCHEME, MemoryFactory::new());
//! registry.resolve_or_create("redis://localhost:6379").unwrap();
//!
//! let song = registry.path_from_uri("redis://localhost:6379/music/song1").unwrap();
//! let mut channel = registry
//!     .open_channel(&song, &OpenOptions::new().write(true).create(true))
//!     .unwrap();
//! channel.write_all(b"a,b,c").unwrap();
//!
//! let mut text = String::new();
//! registry
//!     .open_channel(&song, &OpenOptions::new())
//!     .unwrap()
//!     .read_to_string(&mut text)
//!     .unwrap();
//! assert_eq!(text, "a,b,c");
//! ```

pub use kvfs_kv_store as backend;

pub use kvfs_core::{
    ByteChannel, DirectoryFilter, Endpoint, Error, FileAttributes, FileSystem, FsConfig, Mount,
    OpenOptions, Path, PathMatcher, StoreCapacity,
};
pub use kvfs_provider::{parse_uri, BackendFactory, MemoryFactory, ParsedUri, Registry, REDIS_SCHEME};

#[cfg(feature = "redis")]
pub use kvfs_provider::RedisFactory;
