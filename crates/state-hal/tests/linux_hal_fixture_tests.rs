use state_hal::{FileReadOps, HostPaths, LinuxHal, ProbeOps};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn enumerates_fixture_tree_under_alternate_root() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write(&root.join("sys/block/vda/size"), "41943040\n");
    write(&root.join("sys/block/vda/vda3/partition"), "3\n");
    write(&root.join("sys/block/vda/vda3/size"), "2097152\n");
    write(&root.join("sys/block/vda/vda3/dev"), "252:3\n");
    write(
        &root.join("run/udev/data/b252:3"),
        "E:ID_FS_LABEL=COS_PERSISTENT\nE:ID_FS_TYPE=ext4\n",
    );
    write(
        &root.join("proc/self/mounts"),
        "/dev/vda3 /usr/local ext4 rw,relatime 0 0\n",
    );
    write(&root.join("proc/cmdline"), "root=LABEL=COS_ACTIVE\n");

    let hal = LinuxHal::with_paths(HostPaths::with_root(root));
    let disks = hal.block_devices().unwrap();
    assert_eq!(disks.len(), 1);
    let part = &disks[0].partitions[0];
    assert_eq!(part.name, "vda3");
    assert_eq!(part.filesystem_label, "COS_PERSISTENT");
    assert_eq!(part.mount_point, "/usr/local");
    assert!(!part.is_read_only);
    assert_eq!(part.size_bytes, 2097152 * 512);

    let cmdline = hal.read_to_string(&hal.paths().proc_cmdline).unwrap();
    assert!(cmdline.contains("COS_ACTIVE"));
}

#[test]
fn sysfs_ro_flag_used_when_unmounted() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write(&root.join("sys/block/sdb/size"), "1024\n");
    write(&root.join("sys/block/sdb/sdb1/partition"), "1\n");
    write(&root.join("sys/block/sdb/sdb1/ro"), "1\n");

    let hal = LinuxHal::with_paths(HostPaths::with_root(root));
    let disks = hal.block_devices().unwrap();
    let part = &disks[0].partitions[0];
    assert!(part.is_read_only);
    assert!(part.mount_point.is_empty());
    assert_eq!(part.size_bytes, 0);
}
