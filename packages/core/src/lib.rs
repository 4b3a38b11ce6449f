//! Core kvfs layer: files over a flat key/value store.
//!
//! This crate turns the raw primitives of `kvfs-kv-store` into file
//! semantics:
//!
//! - `Path`: hierarchical names flattened into one backend key
//! - `FileSystem`: existence, metadata, delete/rename/copy, prefix-scan
//!   directory listing and capacity for one endpoint
//! - `ByteChannel`: a positioned, growable byte stream over one value
//! - `PathMatcher` / `DirectoryFilter`: `glob:` and `regex:` listing filters
//!
//! # Key Layout
//!
//! | What | Backend key |
//! |---|---|
//! | file bytes | `prefix/seg1/seg2` (just `seg1/seg2` without a prefix) |
//! | file attributes | `Attrs` + content key, a hash of epoch-millisecond fields |
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use kvfs_core::{Endpoint, FileSystem, FsConfig, Mount, OpenOptions};
//! use kvfs_kv_store::MemoryKv;
//!
//! let mount = Mount::new("redis", Endpoint::new("localhost", 6379), "");
//! let fs = Arc::new(FileSystem::new(mount, Arc::new(MemoryKv::new()), FsConfig::default()));
//!
//! let song = fs.path("music", &["song1"]);
//! let mut channel = fs
//!     .open_channel(&song, &OpenOptions::new().write(true).create(true))
//!     .unwrap();
//! channel.write_chunk(b"a,b,c").unwrap();
//!
//! let listing = fs.matching_keys(&fs.path("music", &[]), None).unwrap();
//! assert!(listing.contains(&song));
//! ```

mod attributes;
mod capacity;
mod channel;
mod config;
mod endpoint;
mod error;
mod filesystem;
mod matcher;
mod options;
mod path;

pub use attributes::{
    FileAttributes, ATTRIBUTE_TAG, KEY_CREATION_TIME, LAST_ACCESSED_TIME, LAST_MODIFIED_TIME,
};
pub use capacity::StoreCapacity;
pub use channel::ByteChannel;
pub use config::FsConfig;
pub use endpoint::{Endpoint, Mount};
pub use error::Error;
pub use filesystem::FileSystem;
pub use matcher::{DirectoryFilter, PathMatcher};
pub use options::OpenOptions;
pub use path::Path;
