//! Device probing operations (sysfs enumeration, findmnt, lsblk).

use super::ProcessOps;
use crate::sysfs::block::BlockDisk;
use crate::HalResult;

/// udev-maintained directory of filesystem-label symlinks.
pub const BY_LABEL_DIR: &str = "/dev/disk/by-label";

/// Arguments for `findmnt` looking up a filesystem by its label.
pub fn findmnt_by_label_args(label: &str) -> Vec<String> {
    vec![
        format!("{}/{}", BY_LABEL_DIR, label),
        "-f".to_string(),
        "-J".to_string(),
        "-o".to_string(),
        "TARGET,FS-OPTIONS".to_string(),
    ]
}

/// Arguments for `lsblk` listing the device behind a filesystem label.
pub fn lsblk_by_label_args(label: &str) -> Vec<String> {
    vec![
        format!("{}/{}", BY_LABEL_DIR, label),
        "-o".to_string(),
        "PATH,FSTYPE,MOUNTPOINT,SIZE,RO,LABEL".to_string(),
        "-b".to_string(),
        "-J".to_string(),
    ]
}

/// Probing operations trait.
pub trait ProbeOps: ProcessOps {
    /// Enumerate disks and their partitions.
    ///
    /// An error here means the enumerator itself could not start (e.g. sysfs is missing).
    fn block_devices(&self) -> HalResult<Vec<BlockDisk>>;

    /// Raw `findmnt -J` output for the filesystem carrying `label`.
    fn findmnt_by_label(&self, label: &str) -> HalResult<String> {
        let args = findmnt_by_label_args(label);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.command_stdout("findmnt", &args)
    }

    /// Raw `lsblk -J` output for the device carrying `label`.
    fn lsblk_by_label(&self, label: &str) -> HalResult<String> {
        let args = lsblk_by_label_args(label);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.command_stdout("lsblk", &args)
    }
}
