//! Hardware and OS facts, carried verbatim in the snapshot under `system`.

use serde_json::{json, Value};
use state_hal::HostPaths;
use std::fs;
use std::path::Path;
use sysinfo::System;

/// Source of the opaque `system` blob.
pub trait FactsProvider {
    fn facts(&self) -> Value;
}

/// Facts gathered through `sysinfo` plus the DMI strings and machine id under `paths`.
///
/// Only the file-backed fields follow `paths`; hostname, OS, kernel, CPU and memory
/// always come from the live host, even when `paths` points into a fixture tree.
#[derive(Debug, Clone, Default)]
pub struct SysinfoFacts {
    paths: HostPaths,
}

impl SysinfoFacts {
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }
}

impl FactsProvider for SysinfoFacts {
    fn facts(&self) -> Value {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let cpu = sys.cpus().first();
        let dmi = |name: &str| read_trimmed(self.paths.dmi_root.join(name));

        json!({
            "node": {
                "hostname": System::host_name().unwrap_or_default(),
                "machineid": read_trimmed(&self.paths.machine_id),
            },
            "os": {
                "name": System::name().unwrap_or_default(),
                "version": System::os_version().unwrap_or_default(),
                "id": System::distribution_id(),
            },
            "kernel": {
                "release": System::kernel_version().unwrap_or_default(),
                "architecture": System::cpu_arch().unwrap_or_default(),
            },
            "product": {
                "name": dmi("product_name"),
                "vendor": dmi("sys_vendor"),
                "version": dmi("product_version"),
            },
            "board": {
                "name": dmi("board_name"),
                "vendor": dmi("board_vendor"),
            },
            "bios": {
                "vendor": dmi("bios_vendor"),
                "version": dmi("bios_version"),
                "date": dmi("bios_date"),
            },
            "cpu": {
                "vendor": cpu.map(|c| c.vendor_id().to_string()).unwrap_or_default(),
                "model": cpu.map(|c| c.brand().to_string()).unwrap_or_default(),
                "speed": cpu.map(|c| c.frequency()).unwrap_or(0),
                "threads": sys.cpus().len(),
            },
            "memory": {
                "size_bytes": sys.total_memory(),
                "swap_bytes": sys.total_swap(),
            },
        })
    }
}

/// Fixed facts, for tests and for callers that gather inventory elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StaticFacts(pub Value);

impl FactsProvider for StaticFacts {
    fn facts(&self) -> Value {
        self.0.clone()
    }
}

fn read_trimmed(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
