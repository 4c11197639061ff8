//! Parsing helpers for `/proc/self/mounts` (fstab-formatted mount table).

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: String,
}

impl MountEntry {
    pub fn is_read_only(&self) -> bool {
        self.options.split(',').any(|opt| opt == "ro")
    }
}

pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            let options = fields.next().unwrap_or_default();
            Some(MountEntry {
                source: unescape_mount_path(source),
                mount_point: unescape_mount_path(mount_point),
                fs_type: fs_type.to_string(),
                options: options.to_string(),
            })
        })
        .collect()
}

/// Last mount whose source is exactly `dev_path`; later lines in the table stack on top
/// of earlier ones, so the last entry is the visible mount.
///
/// Mounts made through `/dev/disk/by-label/...` do not match here; the resolver repairs
/// that gap with `findmnt`.
pub fn mount_for_device<'a>(
    entries: &'a [MountEntry],
    dev_path: &Path,
) -> Option<&'a MountEntry> {
    let wanted = dev_path.to_string_lossy();
    entries.iter().rev().find(|entry| entry.source == wanted)
}

pub fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "/dev/sda2 /oem ext4 rw,relatime 0 0\n\
                          /dev/sda3 /run/initramfs/cos-state ext4 ro,relatime 0 0\n\
                          proc /proc proc rw,nosuid,nodev,noexec 0 0\n";

    #[test]
    fn parse_mounts_extracts_fields() {
        let entries = parse_mounts(SAMPLE);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].source, "/dev/sda2");
        assert_eq!(entries[0].mount_point, "/oem");
        assert_eq!(entries[0].fs_type, "ext4");
        assert!(!entries[0].is_read_only());
        assert!(entries[1].is_read_only());
    }

    #[test]
    fn mount_for_device_matches_exact_source() {
        let entries = parse_mounts(SAMPLE);
        let found = mount_for_device(&entries, Path::new("/dev/sda3")).unwrap();
        assert_eq!(found.mount_point, "/run/initramfs/cos-state");
        assert!(mount_for_device(&entries, Path::new("/dev/sda")).is_none());
    }

    #[test]
    fn mount_for_device_prefers_the_last_entry() {
        let entries = parse_mounts(
            "/dev/sda3 /run/initramfs/cos-state ext4 ro 0 0\n\
             /dev/sda2 /oem ext4 rw 0 0\n\
             /dev/sda3 /usr/local ext4 rw 0 0\n",
        );
        let found = mount_for_device(&entries, Path::new("/dev/sda3")).unwrap();
        assert_eq!(found.mount_point, "/usr/local");
        assert!(!found.is_read_only());
    }

    #[test]
    fn mounts_unescape_paths() {
        let entries = parse_mounts("/dev/sdb1 /mnt/data\\040disk ext4 rw 0 0\n");
        assert_eq!(entries[0].mount_point, "/mnt/data disk");
    }

    #[test]
    fn ro_detection_ignores_substrings() {
        let entries = parse_mounts("/dev/sdb1 /mnt ext4 rw,errors=remount-ro 0 0\n");
        assert!(!entries[0].is_read_only());
    }
}
