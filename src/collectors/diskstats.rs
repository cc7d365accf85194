//! Disk I/O statistics collector.
//!
//! Reads per-device counters from /proc/diskstats.

use serde::Serialize;
use std::collections::HashMap;
use std::fs;

/// Size of a sector as reported by /proc/diskstats.
pub const SECTOR_SIZE_BYTES: u64 = 512;

/// Disk statistics for a single device.
#[derive(Debug, Clone, Serialize)]
pub struct DiskStats {
    pub reads_completed: u64,
    pub reads_merged: u64,
    pub sectors_read: u64,
    pub time_reading_ms: u64,
    pub writes_completed: u64,
    pub writes_merged: u64,
    pub sectors_written: u64,
    pub time_writing_ms: u64,
    pub ios_in_progress: u64,
    pub time_io_ms: u64,
    pub weighted_time_io_ms: u64,
}

impl DiskStats {
    pub fn read_bytes(&self) -> u64 {
        self.sectors_read * SECTOR_SIZE_BYTES
    }

    pub fn written_bytes(&self) -> u64 {
        self.sectors_written * SECTOR_SIZE_BYTES
    }
}

/// Reads disk statistics from /proc/diskstats.
pub fn read_diskstats() -> Result<HashMap<String, DiskStats>, String> {
    let content = fs::read_to_string("/proc/diskstats")
        .map_err(|e| format!("Failed to read /proc/diskstats: {}", e))?;
    Ok(parse_diskstats(&content))
}

/// Parses /proc/diskstats content, skipping loop and ram devices.
///
/// Format: major minor name read_ios read_merges read_sectors read_ticks write_ios
/// write_merges write_sectors write_ticks ios_in_progress time_in_queue weighted_time_in_queue
pub fn parse_diskstats(content: &str) -> HashMap<String, DiskStats> {
    let mut stats = HashMap::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }

        let device = parts[2];
        if device.starts_with("loop") || device.starts_with("ram") {
            continue;
        }

        let field = |i: usize| parts[i].parse::<u64>().unwrap_or(0);

        stats.insert(
            device.to_string(),
            DiskStats {
                reads_completed: field(3),
                reads_merged: field(4),
                sectors_read: field(5),
                time_reading_ms: field(6),
                writes_completed: field(7),
                writes_merged: field(8),
                sectors_written: field(9),
                time_writing_ms: field(10),
                ios_in_progress: field(11),
                time_io_ms: field(12),
                weighted_time_io_ms: field(13),
            },
        );
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_diskstats() {
        let content = "   7       0 loop0 10 0 20 0 0 0 0 0 0 0 0\n\
   8       0 sda 1500 20 30000 400 800 10 16000 900 2 1200 1300\n";
        let stats = parse_diskstats(content);

        assert_eq!(stats.len(), 1);
        let sda = &stats["sda"];
        assert_eq!(sda.reads_completed, 1500);
        assert_eq!(sda.read_bytes(), 30000 * 512);
        assert_eq!(sda.written_bytes(), 16000 * 512);
        assert_eq!(sda.ios_in_progress, 2);
        assert_eq!(sda.weighted_time_io_ms, 1300);
    }

    #[test]
    fn test_parse_diskstats_short_line() {
        assert!(parse_diskstats("8 0 sda 1 2 3\n").is_empty());
    }
}
