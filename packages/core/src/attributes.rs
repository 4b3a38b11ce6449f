//! File metadata read from the attribute side-channel key.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Literal prepended to a content key to form its attribute key.
pub const ATTRIBUTE_TAG: &str = "Attrs";

pub const LAST_MODIFIED_TIME: &str = "lastModifiedTime";
pub const LAST_ACCESSED_TIME: &str = "lastAccessedTime";
pub const KEY_CREATION_TIME: &str = "keyCreationTime";

/// Basic attributes of one key.
///
/// Times are epoch milliseconds as written by whatever maintains the
/// attribute key. Absent fields read as 0 (the epoch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub exists: bool,
    pub size: u64,
    pub last_modified_ms: u64,
    pub last_accessed_ms: u64,
    pub created_ms: u64,
    /// Canonical URI string of the path.
    pub file_key: String,
}

impl FileAttributes {
    pub fn is_regular_file(&self) -> bool {
        self.exists
    }

    pub fn is_directory(&self) -> bool {
        false
    }

    pub fn is_symbolic_link(&self) -> bool {
        false
    }

    pub fn is_other(&self) -> bool {
        false
    }

    pub fn last_modified(&self) -> SystemTime {
        from_millis(self.last_modified_ms)
    }

    pub fn last_accessed(&self) -> SystemTime {
        from_millis(self.last_accessed_ms)
    }

    pub fn created(&self) -> SystemTime {
        from_millis(self.created_ms)
    }
}

fn from_millis(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}

/// Parse one attribute field, treating absent or malformed values as 0.
pub(crate) fn parse_millis(key: &str, field: &str, raw: Option<String>) -> u64 {
    let Some(raw) = raw else {
        return 0;
    };
    match raw.trim().parse::<i64>() {
        Ok(ms) if ms >= 0 => ms as u64,
        _ => {
            log::warn!("Ignoring malformed attribute {}.{}: {:?}", key, field, raw);
            0
        }
    }
}
