//! Filesystem statistics collector.
//!
//! Lists mounts from /proc/mounts and queries usage with statvfs(3).

use serde::Serialize;
use std::fs;

/// Filesystem statistics for a single mount point.
#[derive(Debug, Clone, Serialize)]
pub struct FilesystemStats {
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
    pub size_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
    pub files_total: u64,
    pub files_free: u64,
}

/// A single entry of /proc/mounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
}

/// Usage numbers returned by statvfs.
struct VfsUsage {
    size_bytes: u64,
    available_bytes: u64,
    used_bytes: u64,
    files_total: u64,
    files_free: u64,
}

/// Reads usage of every real mounted filesystem.
pub fn read_filesystem_stats() -> Result<Vec<FilesystemStats>, String> {
    let mounts_content = fs::read_to_string("/proc/mounts")
        .map_err(|e| format!("Failed to read /proc/mounts: {}", e))?;

    let stats = parse_mounts(&mounts_content)
        .into_iter()
        .filter_map(|mount| {
            // Skip filesystems we can't stat
            let usage = statvfs_usage(&mount.mount_point).ok()?;
            Some(FilesystemStats {
                device: mount.device,
                mount_point: mount.mount_point,
                fstype: mount.fstype,
                size_bytes: usage.size_bytes,
                available_bytes: usage.available_bytes,
                used_bytes: usage.used_bytes,
                files_total: usage.files_total,
                files_free: usage.files_free,
            })
        })
        .collect();

    Ok(stats)
}

/// Parses /proc/mounts, dropping pseudo filesystems and system mount points.
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let device = parts.next()?;
            let mount_point = parts.next()?;
            let fstype = parts.next()?;
            if should_skip_filesystem(fstype, mount_point) {
                return None;
            }
            Some(MountEntry {
                device: device.to_string(),
                mount_point: mount_point.to_string(),
                fstype: fstype.to_string(),
            })
        })
        .collect()
}

/// Checks if a filesystem should be skipped based on type and mount point.
fn should_skip_filesystem(fstype: &str, mount_point: &str) -> bool {
    const SKIP_TYPES: &[&str] = &[
        "proc",
        "sysfs",
        "devpts",
        "devtmpfs",
        "tmpfs",
        "cgroup",
        "cgroup2",
        "pstore",
        "bpf",
        "debugfs",
        "tracefs",
        "fusectl",
        "configfs",
        "securityfs",
        "hugetlbfs",
        "mqueue",
        "autofs",
        "binfmt_misc",
        "overlay",
        "squashfs",
    ];

    if SKIP_TYPES.contains(&fstype) {
        return true;
    }

    ["/proc", "/sys", "/dev", "/run"]
        .iter()
        .any(|prefix| mount_point.starts_with(prefix))
}

/// Gets filesystem usage using libc statvfs.
fn statvfs_usage(path: &str) -> Result<VfsUsage, String> {
    use std::ffi::CString;
    use std::mem;

    let c_path = CString::new(path).map_err(|e| format!("Invalid path: {}", e))?;

    // SAFETY: statvfs only writes into the zeroed struct we own, and c_path
    // is a valid NUL-terminated string for the duration of the call.
    let stat = unsafe {
        let mut stat: libc::statvfs = mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(format!("statvfs failed for {}", path));
        }
        stat
    };

    let block_size = stat.f_frsize as u64;
    let size_bytes = block_size * stat.f_blocks as u64;
    let free_bytes = block_size * stat.f_bfree as u64;

    Ok(VfsUsage {
        size_bytes,
        available_bytes: block_size * stat.f_bavail as u64,
        used_bytes: size_bytes.saturating_sub(free_bytes),
        files_total: stat.f_files as u64,
        files_free: stat.f_ffree as u64,
    })
}
