//! Per-filesystem configuration.

use std::time::Duration;

use kvfs_kv_store::PoolOptions;
use serde::{Deserialize, Serialize};

use crate::Error;

const MIB: u64 = 1024 * 1024;

/// Settings applied when a filesystem is created for an endpoint.
///
/// Every field has a default, so an empty JSON object is a valid config.
///
/// ```rust
/// use kvfs_core::FsConfig;
///
/// let config: FsConfig = serde_json::from_str(r#"{"max_connections": 16}"#).unwrap();
/// assert_eq!(config.max_connections, 16);
/// assert_eq!(config.connection_timeout_ms, 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Upper bound on pooled connections per endpoint.
    pub max_connections: u32,
    /// How long a checkout waits for a free connection.
    pub connection_timeout_ms: u64,
    /// A reported `maxmemory` at or below this is treated as unbounded.
    pub maxmemory_floor: u64,
    /// Capacity to report when the backend has no plausible limit.
    pub memory_ceiling: Option<u64>,
    /// Key prefix to use instead of the one in the URI path.
    pub key_prefix: Option<String>,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            max_connections: 8,
            connection_timeout_ms: 2000,
            maxmemory_floor: MIB,
            memory_ceiling: None,
            key_prefix: None,
        }
    }
}

impl FsConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_connections == 0 {
            return Err(Error::invalid_argument("max_connections must be at least 1"));
        }
        if self.connection_timeout_ms == 0 {
            return Err(Error::invalid_argument(
                "connection_timeout_ms must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_size: self.max_connections,
            connection_timeout: Duration::from_millis(self.connection_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = FsConfig::default();
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.maxmemory_floor, 1024 * 1024);
        assert!(config.key_prefix.is_none());
        assert_eq!(config.pool_options(), PoolOptions::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_is_default() {
        let config: FsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FsConfig::default());
    }

    #[test]
    fn json_overrides() {
        let config: FsConfig = serde_json::from_str(
            r#"{"connection_timeout_ms": 500, "memory_ceiling": 4096, "key_prefix": "archive"}"#,
        )
        .unwrap();
        assert_eq!(
            config.pool_options().connection_timeout,
            Duration::from_millis(500)
        );
        assert_eq!(config.memory_ceiling, Some(4096));
        assert_eq!(config.key_prefix.as_deref(), Some("archive"));
    }

    #[test]
    fn zero_connections_rejected() {
        let config = FsConfig {
            max_connections: 0,
            ..FsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidArgument { .. })
        ));
    }
}
