//! Network interface statistics collector.
//!
//! Reads per-interface counters from /proc/net/dev.

use serde::Serialize;
use std::collections::HashMap;
use std::fs;

/// Network interface statistics.
#[derive(Debug, Clone, Serialize)]
pub struct NetDevStats {
    pub receive_bytes: u64,
    pub receive_packets: u64,
    pub receive_errs: u64,
    pub receive_drop: u64,
    pub transmit_bytes: u64,
    pub transmit_packets: u64,
    pub transmit_errs: u64,
    pub transmit_drop: u64,
}

/// Reads network interface statistics from /proc/net/dev.
pub fn read_netdev_stats() -> Result<HashMap<String, NetDevStats>, String> {
    let content = fs::read_to_string("/proc/net/dev")
        .map_err(|e| format!("Failed to read /proc/net/dev: {}", e))?;
    Ok(parse_netdev(&content))
}

/// Parses /proc/net/dev content into a map keyed by interface name.
pub fn parse_netdev(content: &str) -> HashMap<String, NetDevStats> {
    let mut stats = HashMap::new();

    // First two lines are headers
    for line in content.lines().skip(2) {
        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<u64> = counters
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if values.len() < 16 {
            continue;
        }

        stats.insert(
            interface.trim().to_string(),
            NetDevStats {
                receive_bytes: values[0],
                receive_packets: values[1],
                receive_errs: values[2],
                receive_drop: values[3],
                transmit_bytes: values[8],
                transmit_packets: values[9],
                transmit_errs: values[10],
                transmit_drop: values[11],
            },
        );
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET_DEV: &str = "Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0
  eth0: 52428800  4000  2    1    0     0          0        12  1048576   3000    0    3    0     0       0          0
";

    #[test]
    fn test_parse_netdev() {
        let stats = parse_netdev(NET_DEV);
        assert_eq!(stats.len(), 2);

        let eth0 = &stats["eth0"];
        assert_eq!(eth0.receive_bytes, 52_428_800);
        assert_eq!(eth0.receive_errs, 2);
        assert_eq!(eth0.receive_drop, 1);
        assert_eq!(eth0.transmit_bytes, 1_048_576);
        assert_eq!(eth0.transmit_packets, 3000);
        assert_eq!(eth0.transmit_drop, 3);
    }

    #[test]
    fn test_parse_netdev_skips_malformed_lines() {
        let stats = parse_netdev("header\nheader\n  eth1: 1 2 3\ngarbage\n");
        assert!(stats.is_empty());
    }
}
