//! Advisory capacity estimates from backend memory statistics.

use kvfs_kv_store::MemoryInfo;

use crate::FsConfig;

/// A best-effort view of how much data an endpoint can hold.
///
/// Backends report memory, not disk, and the figures shift with
/// fragmentation and eviction policy. Treat these numbers as hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapacity {
    pub used: u64,
    pub total: u64,
}

impl StoreCapacity {
    /// Pick the capacity from a memory report.
    ///
    /// Order of preference: the backend's `maxmemory` when above the
    /// configured floor, then the configured ceiling, then the machine's
    /// total memory.
    ///
    /// The ceiling stands in for the adapter process's own memory ceiling.
    /// It is whatever `FsConfig::memory_ceiling` says, never a figure
    /// measured from the running process, so it is only as accurate as
    /// the configuration.
    pub fn from_memory_info(info: &MemoryInfo, config: &FsConfig) -> Self {
        let total = if info.maxmemory > config.maxmemory_floor {
            info.maxmemory
        } else if let Some(ceiling) = config.memory_ceiling {
            log::debug!(
                "maxmemory {} not above floor {}, using configured ceiling {}",
                info.maxmemory,
                config.maxmemory_floor,
                ceiling
            );
            ceiling
        } else {
            info.total_system_memory
        };
        Self {
            used: info.used_memory,
            total,
        }
    }

    pub fn usable(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }
}
