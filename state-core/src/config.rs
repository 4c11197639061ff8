use crate::partition::RoleLabels;
use state_hal::HostPaths;
use std::env;
use std::path::Path;

/// Environment variable that pins the snapshot identifier.
pub const UUID_ENV: &str = "UUID";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub paths: HostPaths,
    pub labels: RoleLabels,
    /// Fixed snapshot identifier; a random v4 UUID is generated when unset.
    pub snapshot_uuid: Option<String>,
}

impl Config {
    pub fn new(paths: HostPaths) -> Self {
        Self {
            paths,
            ..Self::default()
        }
    }

    /// Host paths re-anchored under `root`.
    ///
    /// Only file reads move. The `findmnt`/`lsblk` fallbacks and the `sysinfo` facts still
    /// query the live host.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self::new(HostPaths::with_root(root))
    }

    /// Apply environment overrides (`UUID`).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = env::var(UUID_ENV) {
            if !value.trim().is_empty() {
                self.snapshot_uuid = Some(value.trim().to_string());
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env;

    #[test]
    fn env_override_pins_uuid() {
        let _guard = test_env::lock();
        env::set_var(UUID_ENV, "pinned-uuid");
        let cfg = Config::default().with_env_overrides();
        env::remove_var(UUID_ENV);
        assert_eq!(cfg.snapshot_uuid.as_deref(), Some("pinned-uuid"));
    }

    #[test]
    fn env_override_ignores_blank_uuid() {
        let _guard = test_env::lock();
        env::set_var(UUID_ENV, "  ");
        let cfg = Config::default().with_env_overrides();
        env::remove_var(UUID_ENV);
        assert_eq!(cfg.snapshot_uuid, None);
    }

    #[test]
    fn with_root_rebases_paths() {
        let cfg = Config::with_root("/mnt/sysroot");
        assert_eq!(
            cfg.paths.proc_cmdline,
            std::path::PathBuf::from("/mnt/sysroot/proc/cmdline")
        );
        assert_eq!(cfg.labels, RoleLabels::default());
    }
}
