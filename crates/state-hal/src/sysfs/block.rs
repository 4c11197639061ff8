//! Block device enumeration from sysfs, the udev database and the mount table.

use crate::procfs::mounts::{mount_for_device, MountEntry};
use crate::{HalError, HalResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDisk {
    pub name: String,
    pub size_bytes: u64,
    pub partitions: Vec<BlockPartition>,
}

/// One partition as seen by the enumerator.
///
/// `mount_point` is only known when the partition was mounted through its device node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPartition {
    /// Kernel name, e.g. `sda2`.
    pub name: String,
    /// Partition-table label (GPT name).
    pub label: String,
    pub filesystem_label: String,
    pub fs_type: String,
    pub uuid: String,
    pub size_bytes: u64,
    pub mount_point: String,
    pub is_read_only: bool,
}

pub fn device_basename(path: &Path) -> HalResult<String> {
    let name = path
        .file_name()
        .ok_or_else(|| HalError::Other(format!("invalid device path {}", path.display())))?
        .to_string_lossy()
        .to_string();
    Ok(name)
}

/// Reads the block device size from `<sysfs dir>/size`.
///
/// The `size` file is expressed in 512-byte sectors.
pub fn block_device_size_bytes(sys_block_dev_dir: &Path) -> HalResult<u64> {
    let sectors_str = fs::read_to_string(sys_block_dev_dir.join("size"))?;
    let sectors: u64 = sectors_str
        .trim()
        .parse()
        .map_err(|_| HalError::Parse(format!("bad sector count {:?}", sectors_str.trim())))?;
    Ok(sectors.saturating_mul(512))
}

/// Enumerate disks under `sys_block_root`, sorted by name, with partitions sorted by name.
///
/// Only failing to read `sys_block_root` itself is an error; unreadable per-device
/// attributes degrade to empty values.
pub fn scan_block_devices_in(
    sys_block_root: &Path,
    udev_data_root: &Path,
    mounts: &[MountEntry],
) -> HalResult<Vec<BlockDisk>> {
    let entries =
        fs::read_dir(sys_block_root).map_err(|e| HalError::path_io(sys_block_root, e))?;
    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| !should_skip_block_device(name))
        .collect();
    names.sort();

    let mut out = Vec::new();
    for name in names {
        let sysfs_path = sys_block_root.join(&name);
        let size_bytes = match block_device_size_bytes(&sysfs_path) {
            Ok(v) => v,
            Err(err) => {
                log::debug!("skipping {}: {}", name, err);
                continue;
            }
        };
        if size_bytes == 0 {
            continue;
        }
        let partitions = scan_partitions(&sysfs_path, udev_data_root, mounts);
        out.push(BlockDisk {
            name,
            size_bytes,
            partitions,
        });
    }
    Ok(out)
}

fn scan_partitions(
    disk_path: &Path,
    udev_data_root: &Path,
    mounts: &[MountEntry],
) -> Vec<BlockPartition> {
    let entries = match fs::read_dir(disk_path) {
        Ok(entries) => entries,
        Err(err) => {
            log::debug!("cannot list {}: {}", disk_path.display(), err);
            return Vec::new();
        }
    };
    let mut part_dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.join("partition").exists())
        .collect();
    part_dirs.sort();

    part_dirs
        .iter()
        .filter_map(|path| read_partition(path, udev_data_root, mounts))
        .collect()
}

fn read_partition(
    path: &Path,
    udev_data_root: &Path,
    mounts: &[MountEntry],
) -> Option<BlockPartition> {
    let name = device_basename(path).ok()?;
    let size_bytes = block_device_size_bytes(path).unwrap_or(0);
    let sysfs_ro = read_trimmed(path.join("ro")).as_deref() == Some("1");
    let udev = read_trimmed(path.join("dev"))
        .map(|dev| udev_properties(udev_data_root, &dev))
        .unwrap_or_default();

    let dev_path = PathBuf::from("/dev").join(&name);
    let mount = mount_for_device(mounts, &dev_path);
    let prop = |key: &str| udev.get(key).cloned().unwrap_or_default();

    let mut fs_type = prop("ID_FS_TYPE");
    if fs_type.is_empty() {
        if let Some(m) = mount {
            fs_type = m.fs_type.clone();
        }
    }

    Some(BlockPartition {
        label: prop("ID_PART_ENTRY_NAME"),
        filesystem_label: prop("ID_FS_LABEL"),
        uuid: prop("ID_PART_ENTRY_UUID"),
        fs_type,
        size_bytes,
        mount_point: mount.map(|m| m.mount_point.clone()).unwrap_or_default(),
        is_read_only: mount.map(MountEntry::is_read_only).unwrap_or(sysfs_ro),
        name,
    })
}

/// Reads `<udev data>/b<major>:<minor>` for a device whose `dev` attribute is `major:minor`.
fn udev_properties(udev_data_root: &Path, dev: &str) -> HashMap<String, String> {
    let path = udev_data_root.join(format!("b{}", dev));
    match fs::read_to_string(&path) {
        Ok(content) => parse_udev_properties(&content),
        Err(err) => {
            log::debug!("no udev data at {}: {}", path.display(), err);
            HashMap::new()
        }
    }
}

/// Parses the `E:KEY=VALUE` lines of a udev database entry.
pub fn parse_udev_properties(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.strip_prefix("E:"))
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn read_trimmed(path: PathBuf) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn should_skip_block_device(name: &str) -> bool {
    // Device-mapper volumes (LVM) are left to the lsblk fallback.
    name.starts_with("loop")
        || name.starts_with("ram")
        || name.starts_with("zram")
        || name.starts_with("dm-")
        || name.starts_with("sr")
}
