//! `lsblk -J` output.
//!
//! Older util-linux prints `ro` and `size` as strings, newer releases as JSON booleans and
//! numbers; both shapes are accepted.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lsblk {
    #[serde(default, rename = "blockdevices", alias = "block_devices")]
    pub block_devices: Vec<LsblkDevice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LsblkDevice {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub fstype: Option<String>,
    #[serde(default)]
    pub size: Option<Scalar>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub ro: Option<Scalar>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(u64),
    Text(String),
}

impl Scalar {
    pub fn as_bool(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => *n != 0,
            Scalar::Text(s) => matches!(s.trim(), "1" | "true"),
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }
}

impl LsblkDevice {
    pub fn is_read_only(&self) -> bool {
        self.ro.as_ref().map(Scalar::as_bool).unwrap_or(false)
    }

    pub fn size_bytes(&self) -> u64 {
        self.size.as_ref().and_then(Scalar::as_u64).unwrap_or(0)
    }
}

pub fn parse_lsblk(output: &str) -> Option<Lsblk> {
    match serde_json::from_str(output) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::debug!("unparsable lsblk output: {}", err);
            None
        }
    }
}
