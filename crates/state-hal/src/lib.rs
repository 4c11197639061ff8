//! kairos-state Hardware Abstraction Layer (HAL).
//!
//! Everything that touches the host (reading `/proc` and `/sys`, spawning
//! `findmnt`/`lsblk`) goes through the traits in [`hal`] so the resolver can be
//! exercised against [`FakeHal`] without root or real disks.

pub mod hal;
pub mod os_release;
pub mod paths;
pub mod procfs;
pub mod sysfs;

pub use hal::{
    findmnt_by_label_args, lsblk_by_label_args, FakeHal, FileReadOps, LinuxHal, Operation,
    ProbeOps, ProcessOps, StateHal, BY_LABEL_DIR,
};
pub use paths::HostPaths;
pub use state_error::{HalError, HalResult};
pub use sysfs::block::{BlockDisk, BlockPartition};
