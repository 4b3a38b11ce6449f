//! kvfs provider: resolves URIs to filesystems and dispatches operations.
//!
//! A [`Registry`] owns at most one [`FileSystem`](kvfs_core::FileSystem)
//! per endpoint. Callers hand it URIs such as
//! `redis://host:port/prefix/music/song1`; it creates or finds the
//! filesystem for `host:port` and routes path operations to it.
//!
//! Backends are plugged in through [`BackendFactory`]:
//!
//! - `RedisFactory` (feature `redis`, on by default) opens pooled
//!   connections to real servers
//! - [`MemoryFactory`] serves every endpoint from memory, for tests and
//!   local experiments

mod factory;
mod registry;
mod uri;

pub use factory::{BackendFactory, MemoryFactory};
pub use registry::{Registry, REDIS_SCHEME};
pub use uri::{parse_uri, ParsedUri};

#[cfg(feature = "redis")]
pub use factory::RedisFactory;
