//! Read-only file access.
//!
//! Boot classification and the release-file probe read through this trait so tests can
//! serve `/proc/cmdline` and `/etc/os-release` from memory.

use crate::HalResult;
use std::path::Path;

pub trait FileReadOps {
    fn read_file(&self, path: &Path) -> HalResult<Vec<u8>>;

    fn read_to_string(&self, path: &Path) -> HalResult<String> {
        Ok(String::from_utf8(self.read_file(path)?)?)
    }
}
