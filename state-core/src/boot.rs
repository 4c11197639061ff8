//! Boot mode classification from the kernel command line.

use serde::{Deserialize, Serialize};
use state_hal::{FileReadOps, HalResult};
use std::fmt;
use std::fs;
use std::path::Path;

pub const PROC_CMDLINE: &str = "/proc/cmdline";

/// Which image the machine booted from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Boot {
    #[serde(rename = "active_boot")]
    Active,
    #[serde(rename = "passive_boot")]
    Passive,
    #[serde(rename = "recovery_boot")]
    Recovery,
    #[serde(rename = "livecd_boot")]
    LiveMedia,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Boot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Boot::Active => "active_boot",
            Boot::Passive => "passive_boot",
            Boot::Recovery => "recovery_boot",
            Boot::LiveMedia => "livecd_boot",
            Boot::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Boot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const LIVE_MARKERS: [&str; 3] = ["live:LABEL", "live:CDLABEL", "netboot"];

/// Classify kernel boot parameters. First matching rule wins.
pub fn classify(cmdline: &str) -> Boot {
    if cmdline.contains("COS_ACTIVE") {
        Boot::Active
    } else if cmdline.contains("COS_PASSIVE") {
        Boot::Passive
    } else if cmdline.contains("COS_RECOVERY") || cmdline.contains("COS_SYSTEM") {
        Boot::Recovery
    } else if LIVE_MARKERS.iter().any(|m| cmdline.contains(m)) {
        Boot::LiveMedia
    } else {
        Boot::Unknown
    }
}

/// Classify the running kernel's command line. Read failures yield [`Boot::Unknown`].
pub fn detect_boot() -> Boot {
    detect_boot_from(Path::new(PROC_CMDLINE))
}

pub fn detect_boot_from(path: &Path) -> Boot {
    match fs::read(path) {
        Ok(bytes) => classify(&String::from_utf8_lossy(&bytes)),
        Err(err) => {
            log::debug!("cannot read {}: {}", path.display(), err);
            Boot::Unknown
        }
    }
}

/// Classify the command line read through `fs`, propagating read failures.
pub fn detect_boot_with_fs<F: FileReadOps + ?Sized>(fs: &F, path: &Path) -> HalResult<Boot> {
    let bytes = fs.read_file(path)?;
    Ok(classify(&String::from_utf8_lossy(&bytes)))
}
