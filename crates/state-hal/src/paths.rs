//! Host locations the probes read from.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    pub proc_cmdline: PathBuf,
    pub proc_mounts: PathBuf,
    pub sys_block: PathBuf,
    pub udev_data: PathBuf,
    pub kairos_release: PathBuf,
    pub os_release: PathBuf,
    /// Directory of DMI identity strings (`product_name`, `bios_vendor`, ...).
    pub dmi_root: PathBuf,
    pub machine_id: PathBuf,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            proc_cmdline: PathBuf::from("/proc/cmdline"),
            proc_mounts: PathBuf::from("/proc/self/mounts"),
            sys_block: PathBuf::from("/sys/block"),
            udev_data: PathBuf::from("/run/udev/data"),
            kairos_release: PathBuf::from("/etc/kairos-release"),
            os_release: PathBuf::from("/etc/os-release"),
            dmi_root: PathBuf::from("/sys/devices/virtual/dmi/id"),
            machine_id: PathBuf::from("/etc/machine-id"),
        }
    }
}

impl HostPaths {
    /// Re-anchor every path under `root` (e.g. a chroot or a test fixture tree).
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let d = Self::default();
        Self {
            proc_cmdline: rebase(root, &d.proc_cmdline),
            proc_mounts: rebase(root, &d.proc_mounts),
            sys_block: rebase(root, &d.sys_block),
            udev_data: rebase(root, &d.udev_data),
            kairos_release: rebase(root, &d.kairos_release),
            os_release: rebase(root, &d.os_release),
            dmi_root: rebase(root, &d.dmi_root),
            machine_id: rebase(root, &d.machine_id),
        }
    }
}

fn rebase(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix("/") {
        Ok(rel) => root.join(rel),
        Err(_) => root.join(path),
    }
}
