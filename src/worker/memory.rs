use std::fs;

/// Point-in-time memory usage of this process
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySnapshot {
    /// Resident set size of this process
    pub rss_bytes: u64,
    /// Physical memory of the host
    pub total_bytes: u64,
}

impl MemorySnapshot {
    /// Read the current snapshot from procfs. `None` where procfs is unavailable.
    pub fn capture() -> Option<Self> {
        let status = fs::read_to_string("/proc/self/status").ok()?;
        let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
        Self::parse(&status, &meminfo)
    }

    fn parse(status: &str, meminfo: &str) -> Option<Self> {
        let rss_bytes = kib_field(status, "VmRSS:")? * 1024;
        let total_bytes = kib_field(meminfo, "MemTotal:")? * 1024;
        if total_bytes == 0 {
            return None;
        }
        Some(Self { rss_bytes, total_bytes })
    }

    /// Resident memory as a percentage of host memory
    pub fn percent(&self) -> f64 {
        self.rss_bytes as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Value of a `Key:   1234 kB` line
fn kib_field(contents: &str, key: &str) -> Option<u64> {
    contents
        .lines()
        .find_map(|line| line.strip_prefix(key))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse().ok())
}
