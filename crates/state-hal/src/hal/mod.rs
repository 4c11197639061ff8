//! HAL trait definitions and implementations.
//!
//! This module defines the core traits for host observation and provides
//! both real (LinuxHal) and fake (FakeHal) implementations.

pub mod fake_hal;
pub mod file_ops;
pub mod linux_hal;
pub mod probe_ops;
pub mod process_ops;

pub use fake_hal::{FakeHal, Operation};
pub use file_ops::FileReadOps;
pub use linux_hal::LinuxHal;
pub use probe_ops::{findmnt_by_label_args, lsblk_by_label_args, ProbeOps, BY_LABEL_DIR};
pub use process_ops::ProcessOps;

/// Complete HAL combining all observation traits.
pub trait StateHal: ProbeOps + FileReadOps + Send + Sync {}

/// Automatically implement StateHal for any type implementing all required traits.
impl<T> StateHal for T where T: ProbeOps + FileReadOps + Send + Sync {}
