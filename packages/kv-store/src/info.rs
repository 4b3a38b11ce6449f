//! Backend memory introspection.

/// The memory figures kvfs reads from a backend's `INFO memory` report.
///
/// All values are in bytes. Absent or malformed fields read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    pub used_memory: u64,
    /// Configured memory limit. Some backends report 0 for "unbounded".
    pub maxmemory: u64,
    pub total_system_memory: u64,
}

impl MemoryInfo {
    /// Parse an `INFO memory` report (`field:value` lines, `#` section headers).
    pub fn parse(report: &str) -> Self {
        let mut info = MemoryInfo::default();
        for line in report.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let slot = match field {
                "used_memory" => &mut info.used_memory,
                "maxmemory" => &mut info.maxmemory,
                "total_system_memory" => &mut info.total_system_memory,
                _ => continue,
            };
            match value.trim().parse() {
                Ok(v) => *slot = v,
                Err(_) => log::warn!("Ignoring malformed memory field {}: {:?}", field, value),
            }
        }
        info
    }
}
