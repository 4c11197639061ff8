//! Parsing helpers for `/etc/os-release` style `KEY=value` files.

use std::collections::BTreeMap;

/// Parses release-file content into a key/value map. Quotes around values are stripped.
pub fn parse_release(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Looks up `KAIROS_<key>` first, then the bare `key`.
pub fn release_value(content: &str, key: &str) -> Option<String> {
    let values = parse_release(content);
    values
        .get(&format!("KAIROS_{}", key))
        .or_else(|| values.get(key))
        .cloned()
}
