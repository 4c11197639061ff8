//! `findmnt -J` output and mount-option read-only detection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static OPT_RW: Lazy<Regex> = Lazy::new(|| Regex::new("^rw,|^rw$|,rw,|,rw$").expect("static regex"));
static OPT_RO: Lazy<Regex> = Lazy::new(|| Regex::new("^ro,|^ro$|,ro,|,ro$").expect("static regex"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindMnt {
    #[serde(default)]
    pub filesystems: Vec<FindMntFilesystem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FindMntFilesystem {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default, rename = "fs-options", alias = "fs_options")]
    pub fs_options: Option<String>,
}

pub fn parse_findmnt(output: &str) -> Option<FindMnt> {
    match serde_json::from_str(output) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::debug!("unparsable findmnt output: {}", err);
            None
        }
    }
}

/// Derive the read-only flag from a mount-options string.
///
/// `rw` and `ro` are matched independently as whole options; when neither is present
/// `current` is returned unchanged.
pub fn read_only_from_options(options: &str, current: bool) -> bool {
    let rw = OPT_RW.is_match(options);
    let ro = OPT_RO.is_match(options);
    if rw && ro {
        // The kernel never reports both; keep the later rule (ro) and say so.
        log::warn!("mount options {:?} carry both rw and ro", options);
    }
    let mut read_only = current;
    if rw {
        read_only = false;
    }
    if ro {
        read_only = true;
    }
    read_only
}
