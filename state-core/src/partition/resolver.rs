//! Tiered partition discovery.
//!
//! 1. sysfs enumeration matched on filesystem label, with the mount point repaired through
//!    `findmnt` when the partition was mounted by label rather than by device node;
//! 2. `lsblk` by label, for OEM and recovery only (LVM volumes are invisible to tier 1).
//!
//! A failing or ambiguous external tool only means that tier has nothing to say.

use super::findmnt::{parse_findmnt, read_only_from_options};
use super::lsblk::parse_lsblk;
use super::{PartitionState, Role, RoleLabels};
use state_hal::{BlockDisk, BlockPartition, HalResult, ProbeOps};

pub struct PartitionResolver<'a, H: ProbeOps + ?Sized> {
    hal: &'a H,
    labels: &'a RoleLabels,
    disks: Vec<BlockDisk>,
}

impl<'a, H: ProbeOps + ?Sized> PartitionResolver<'a, H> {
    /// Enumerate block devices once. Failure here is fatal for partition resolution.
    pub fn new(hal: &'a H, labels: &'a RoleLabels) -> HalResult<Self> {
        let disks = hal.block_devices()?;
        log::debug!("enumerated {} disk(s)", disks.len());
        Ok(Self::from_disks(hal, labels, disks))
    }

    pub fn from_disks(hal: &'a H, labels: &'a RoleLabels, disks: Vec<BlockDisk>) -> Self {
        Self { hal, labels, disks }
    }

    pub fn resolve(&self, role: Role) -> PartitionState {
        let label = self.labels.label(role);
        if let Some(part) = self.find_by_filesystem_label(label) {
            log::info!("{}: found {} by enumeration", role, part.name);
            return self.refine_mount(part);
        }
        if role.has_lsblk_fallback() {
            let state = self.resolve_with_lsblk(label);
            if state.found {
                log::info!("{}: found {} via lsblk", role, state.name);
            }
            return state;
        }
        log::info!("{}: not found", role);
        PartitionState::default()
    }

    /// Last matching partition in enumeration order.
    fn find_by_filesystem_label(&self, label: &str) -> Option<&BlockPartition> {
        self.disks
            .iter()
            .flat_map(|disk| disk.partitions.iter())
            .filter(|part| part.filesystem_label == label)
            .last()
    }

    fn refine_mount(&self, part: &BlockPartition) -> PartitionState {
        let mut mount_point = part.mount_point.clone();
        let mut read_only = part.is_read_only;

        if mount_point.is_empty() && !part.filesystem_label.is_empty() {
            if let Some((target, options)) = self.findmnt_single(&part.filesystem_label) {
                mount_point = target;
                read_only = read_only_from_options(&options, read_only);
            }
        }

        PartitionState {
            mounted: !mount_point.is_empty(),
            name: format!("/dev/{}", part.name),
            label: part.label.clone(),
            filesystem_label: part.filesystem_label.clone(),
            mount_point,
            size_bytes: part.size_bytes,
            fs_type: part.fs_type.clone(),
            is_read_only: read_only,
            found: true,
            uuid: part.uuid.clone(),
        }
    }

    /// Target and options when `findmnt` reports exactly one filesystem for `label`.
    fn findmnt_single(&self, label: &str) -> Option<(String, String)> {
        let output = match self.hal.findmnt_by_label(label) {
            Ok(output) => output,
            Err(err) => {
                log::debug!("findmnt {}: {}", label, err);
                return None;
            }
        };
        let mut parsed = parse_findmnt(&output)?;
        if parsed.filesystems.len() != 1 {
            log::debug!(
                "findmnt {}: {} filesystems, ignoring",
                label,
                parsed.filesystems.len()
            );
            return None;
        }
        let fs = parsed.filesystems.remove(0);
        Some((fs.target.unwrap_or_default(), fs.fs_options.unwrap_or_default()))
    }

    fn resolve_with_lsblk(&self, label: &str) -> PartitionState {
        let output = match self.hal.lsblk_by_label(label) {
            Ok(output) => output,
            Err(err) => {
                log::debug!("lsblk {}: {}", label, err);
                return PartitionState::default();
            }
        };
        let Some(mut parsed) = parse_lsblk(&output) else {
            return PartitionState::default();
        };
        if parsed.block_devices.len() != 1 {
            log::debug!(
                "lsblk {}: {} devices, ignoring",
                label,
                parsed.block_devices.len()
            );
            return PartitionState::default();
        }
        let dev = parsed.block_devices.remove(0);
        let is_read_only = dev.is_read_only();
        let size_bytes = dev.size_bytes();
        let mount_point = dev.mountpoint.unwrap_or_default();
        PartitionState {
            mounted: !mount_point.is_empty(),
            name: dev.path.unwrap_or_default(),
            filesystem_label: dev.label.unwrap_or_default(),
            mount_point,
            size_bytes,
            fs_type: dev.fstype.unwrap_or_default(),
            is_read_only,
            found: true,
            ..PartitionState::default()
        }
    }
}
