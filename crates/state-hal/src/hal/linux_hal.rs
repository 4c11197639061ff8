//! Linux HAL implementation reading the real host.

use super::process_ops::map_command_err;
use super::{FileReadOps, ProbeOps, ProcessOps};
use crate::paths::HostPaths;
use crate::procfs::mounts::parse_mounts;
use crate::sysfs::block::{scan_block_devices_in, BlockDisk};
use crate::{HalError, HalResult};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Real HAL implementation for Linux systems.
#[derive(Debug, Clone, Default)]
pub struct LinuxHal {
    paths: HostPaths,
}

impl LinuxHal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths(paths: HostPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }
}

impl ProcessOps for LinuxHal {
    fn command_output(&self, program: &str, args: &[&str]) -> HalResult<Output> {
        log::debug!("exec: {} {}", program, args.join(" "));
        Command::new(program)
            .args(args)
            .output()
            .map_err(|e| map_command_err(program, e))
    }
}

impl FileReadOps for LinuxHal {
    fn read_file(&self, path: &Path) -> HalResult<Vec<u8>> {
        fs::read(path).map_err(|e| HalError::path_io(path, e))
    }
}

impl ProbeOps for LinuxHal {
    fn block_devices(&self) -> HalResult<Vec<BlockDisk>> {
        // A missing mount table only costs us mount points; the resolver repairs those.
        let mounts = match fs::read_to_string(&self.paths.proc_mounts) {
            Ok(content) => parse_mounts(&content),
            Err(err) => {
                log::debug!("cannot read {}: {}", self.paths.proc_mounts.display(), err);
                Vec::new()
            }
        };
        scan_block_devices_in(&self.paths.sys_block, &self.paths.udev_data, &mounts)
    }
}
