//! Well-known partition roles and their resolved state.

mod findmnt;
mod lsblk;
mod resolver;

pub use findmnt::{parse_findmnt, read_only_from_options, FindMnt, FindMntFilesystem};
pub use lsblk::{parse_lsblk, Lsblk, LsblkDevice, Scalar};
pub use resolver::PartitionResolver;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved state of one well-known partition.
///
/// When `found` is false every other field holds its zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionState {
    pub mounted: bool,
    pub name: String,
    pub label: String,
    #[serde(rename = "filesystemlabel")]
    pub filesystem_label: String,
    pub mount_point: String,
    pub size_bytes: u64,
    #[serde(rename = "type")]
    pub fs_type: String,
    #[serde(rename = "read_only")]
    pub is_read_only: bool,
    pub found: bool,
    /// Partition UUID; may be empty.
    pub uuid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Persistent,
    Recovery,
    Oem,
    State,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Persistent, Role::Recovery, Role::Oem, Role::State];

    pub fn default_label(&self) -> &'static str {
        match self {
            Role::Persistent => "COS_PERSISTENT",
            Role::Recovery => "COS_RECOVERY",
            Role::Oem => "COS_OEM",
            Role::State => "COS_STATE",
        }
    }

    /// Roles that may live on LVM, which sysfs enumeration does not see.
    pub fn has_lsblk_fallback(&self) -> bool {
        matches!(self, Role::Oem | Role::Recovery)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Persistent => "persistent",
            Role::Recovery => "recovery",
            Role::Oem => "oem",
            Role::State => "state",
        };
        f.write_str(name)
    }
}

/// Filesystem labels identifying each role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLabels {
    pub persistent: String,
    pub recovery: String,
    pub oem: String,
    pub state: String,
}

impl Default for RoleLabels {
    fn default() -> Self {
        Self {
            persistent: Role::Persistent.default_label().to_string(),
            recovery: Role::Recovery.default_label().to_string(),
            oem: Role::Oem.default_label().to_string(),
            state: Role::State.default_label().to_string(),
        }
    }
}

impl RoleLabels {
    pub fn label(&self, role: Role) -> &str {
        match role {
            Role::Persistent => &self.persistent,
            Role::Recovery => &self.recovery,
            Role::Oem => &self.oem,
            Role::State => &self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels() {
        let labels = RoleLabels::default();
        assert_eq!(labels.label(Role::Persistent), "COS_PERSISTENT");
        assert_eq!(labels.label(Role::Recovery), "COS_RECOVERY");
        assert_eq!(labels.label(Role::Oem), "COS_OEM");
        assert_eq!(labels.label(Role::State), "COS_STATE");
    }

    #[test]
    fn only_oem_and_recovery_fall_back_to_lsblk() {
        let with: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|r| r.has_lsblk_fallback())
            .collect();
        assert_eq!(with, vec![Role::Recovery, Role::Oem]);
    }

    #[test]
    fn partition_state_serializes_with_stable_keys() {
        let value = serde_json::to_value(PartitionState::default()).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                "filesystemlabel",
                "found",
                "label",
                "mount_point",
                "mounted",
                "name",
                "read_only",
                "size_bytes",
                "type",
                "uuid"
            ]
        );
    }
}
