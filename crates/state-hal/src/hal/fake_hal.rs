//! Fake HAL implementation for testing.
//!
//! This implementation serves scripted command output, in-memory files and a canned block
//! device list, and records every probe, allowing CI-safe testing without root privileges
//! or real hardware.

use super::probe_ops::{findmnt_by_label_args, lsblk_by_label_args};
use super::{FileReadOps, ProbeOps, ProcessOps};
use crate::sysfs::block::BlockDisk;
use crate::{HalError, HalResult};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex, MutexGuard};

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Command { program: String, args: Vec<String> },
    ReadFile { path: PathBuf },
    BlockDevices,
}

#[derive(Debug, Clone)]
struct ScriptedCommand {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

/// Shared state for FakeHal operations.
#[derive(Debug, Clone, Default)]
struct FakeHalState {
    /// All operations that were recorded
    operations: Vec<Operation>,
    files: HashMap<PathBuf, Vec<u8>>,
    /// Keyed by the full command line, program and args joined by spaces
    commands: HashMap<String, ScriptedCommand>,
    disks: Vec<BlockDisk>,
    /// When set, `block_devices` fails with this message
    enumeration_failure: Option<String>,
}

/// Fake HAL implementation that answers probes from scripted data.
///
/// Unscripted commands fail with [`HalError::CommandNotFound`] and unscripted files with a
/// not-found I/O error, which is how a sparse host looks to the resolver.
#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

fn command_key(program: &str, args: &[String]) -> String {
    let mut key = program.to_string();
    for arg in args {
        key.push(' ');
        key.push_str(arg);
    }
    key
}

#[cfg(unix)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

impl FakeHal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeHalState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Serve `contents` for reads of `path`.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.lock().files.insert(path.into(), contents.into());
        self
    }

    /// Script a successful command run.
    pub fn with_command(self, program: &str, args: &[String], stdout: impl Into<String>) -> Self {
        self.script(program, args, 0, stdout.into(), String::new())
    }

    /// Script a command that exits non-zero.
    pub fn with_failing_command(
        self,
        program: &str,
        args: &[String],
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        self.script(program, args, exit_code, String::new(), stderr.into())
    }

    /// Script the `findmnt` lookup for a filesystem label.
    pub fn with_findmnt(self, label: &str, stdout: impl Into<String>) -> Self {
        self.with_command("findmnt", &findmnt_by_label_args(label), stdout)
    }

    /// Script the `lsblk` listing for a filesystem label.
    pub fn with_lsblk(self, label: &str, stdout: impl Into<String>) -> Self {
        self.with_command("lsblk", &lsblk_by_label_args(label), stdout)
    }

    pub fn with_disks(self, disks: Vec<BlockDisk>) -> Self {
        self.lock().disks = disks;
        self
    }

    /// Make block device enumeration fail as if sysfs were unavailable.
    pub fn with_enumeration_failure(self, message: impl Into<String>) -> Self {
        self.lock().enumeration_failure = Some(message.into());
        self
    }

    fn script(
        self,
        program: &str,
        args: &[String],
        exit_code: i32,
        stdout: String,
        stderr: String,
    ) -> Self {
        self.lock().commands.insert(
            command_key(program, args),
            ScriptedCommand {
                exit_code,
                stdout,
                stderr,
            },
        );
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// Get the number of operations recorded.
    pub fn operation_count(&self) -> usize {
        self.lock().operations.len()
    }

    /// Check if a specific operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.lock().operations.iter().any(check)
    }

    /// Whether a command was run for `program` with `label` among its arguments.
    pub fn ran_for_label(&self, program: &str, label: &str) -> bool {
        let needle = format!("{}/{}", super::BY_LABEL_DIR, label);
        self.has_operation(|op| match op {
            Operation::Command { program: p, args } => p == program && args.contains(&needle),
            _ => false,
        })
    }

    /// Clear all recorded operations.
    pub fn clear(&self) {
        self.lock().operations.clear();
    }

    fn record_operation(&self, op: Operation) {
        self.lock().operations.push(op);
    }
}

impl ProcessOps for FakeHal {
    fn command_output(&self, program: &str, args: &[&str]) -> HalResult<Output> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let key = command_key(program, &args);
        self.record_operation(Operation::Command {
            program: program.to_string(),
            args,
        });
        let scripted = self.lock().commands.get(&key).cloned();
        match scripted {
            Some(cmd) => Ok(Output {
                status: exit_status(cmd.exit_code),
                stdout: cmd.stdout.into_bytes(),
                stderr: cmd.stderr.into_bytes(),
            }),
            None => {
                log::debug!("FAKE HAL: unscripted command {}", key);
                Err(HalError::CommandNotFound(program.to_string()))
            }
        }
    }
}

impl FileReadOps for FakeHal {
    fn read_file(&self, path: &Path) -> HalResult<Vec<u8>> {
        self.record_operation(Operation::ReadFile {
            path: path.to_path_buf(),
        });
        self.lock().files.get(path).cloned().ok_or_else(|| {
            HalError::path_io(path, io::Error::new(io::ErrorKind::NotFound, "no such file"))
        })
    }
}

impl ProbeOps for FakeHal {
    fn block_devices(&self) -> HalResult<Vec<BlockDisk>> {
        self.record_operation(Operation::BlockDevices);
        let state = self.lock();
        match &state.enumeration_failure {
            Some(message) => Err(HalError::Other(message.clone())),
            None => Ok(state.disks.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_hal_serves_scripted_findmnt() {
        let hal = FakeHal::new().with_findmnt("COS_OEM", "{\"filesystems\":[]}");
        let out = hal.findmnt_by_label("COS_OEM").unwrap();
        assert_eq!(out, "{\"filesystems\":[]}");
        assert!(hal.ran_for_label("findmnt", "COS_OEM"));
        assert_eq!(hal.operation_count(), 1);
    }

    #[test]
    fn fake_hal_unscripted_command_is_not_found() {
        let hal = FakeHal::new();
        let err = hal.lsblk_by_label("COS_RECOVERY").unwrap_err();
        assert!(matches!(err, HalError::CommandNotFound(ref p) if p == "lsblk"));
        assert!(hal.ran_for_label("lsblk", "COS_RECOVERY"));
    }

    #[test]
    fn fake_hal_failing_command_reports_exit_code() {
        let hal = FakeHal::new().with_failing_command(
            "findmnt",
            &findmnt_by_label_args("COS_STATE"),
            1,
            "findmnt: can't find",
        );
        let err = hal.findmnt_by_label("COS_STATE").unwrap_err();
        match err {
            HalError::CommandFailed { program, code, stderr } => {
                assert_eq!(program, "findmnt");
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "findmnt: can't find");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fake_hal_reads_files() {
        let hal = FakeHal::new().with_file("/proc/cmdline", "BOOT_IMAGE=/vmlinuz");
        assert_eq!(
            hal.read_to_string(Path::new("/proc/cmdline")).unwrap(),
            "BOOT_IMAGE=/vmlinuz"
        );
        assert!(hal.read_file(Path::new("/etc/os-release")).is_err());
        assert!(hal.has_operation(|op| matches!(op, Operation::ReadFile { .. })));
    }

    #[test]
    fn fake_hal_enumeration_failure() {
        let hal = FakeHal::new().with_enumeration_failure("sysfs unavailable");
        assert!(hal.block_devices().is_err());
        hal.clear();
        assert_eq!(hal.operation_count(), 0);
    }
}
