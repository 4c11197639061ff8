//! Kairos flavor and version probe.

use serde::{Deserialize, Serialize};
use state_hal::os_release::release_value;
use state_hal::{FileReadOps, HalError, HalResult, HostPaths};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kairos {
    pub flavor: String,
    pub version: String,
}

/// Look `key` up in the Kairos release file, falling back to os-release.
pub fn release_lookup<F: FileReadOps + ?Sized>(
    fs: &F,
    paths: &HostPaths,
    key: &str,
) -> HalResult<String> {
    let mut last_err = None;
    for path in [&paths.kairos_release, &paths.os_release] {
        match fs.read_to_string(path) {
            Ok(content) => {
                if let Some(value) = release_value(&content, key) {
                    return Ok(value);
                }
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| HalError::Parse(format!("{} not found in release files", key))))
}

/// Flavor and version are looked up independently; a failed lookup leaves that field empty.
pub fn detect_kairos<F: FileReadOps + ?Sized>(fs: &F, paths: &HostPaths) -> Kairos {
    let lookup = |key: &str| {
        release_lookup(fs, paths, key).unwrap_or_else(|err| {
            log::debug!("kairos {} unavailable: {}", key, err);
            String::new()
        })
    };
    Kairos {
        flavor: lookup("FLAVOR"),
        version: lookup("VERSION"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use state_hal::FakeHal;

    #[test]
    fn reads_kairos_release_first() {
        let paths = HostPaths::default();
        let hal = FakeHal::new()
            .with_file(
                &paths.kairos_release,
                "KAIROS_FLAVOR=\"opensuse\"\nKAIROS_VERSION=\"v3.1.0\"\n",
            )
            .with_file(&paths.os_release, "VERSION=\"15.5\"\n");
        let k = detect_kairos(&hal, &paths);
        assert_eq!(k.flavor, "opensuse");
        assert_eq!(k.version, "v3.1.0");
    }

    #[test]
    fn falls_back_to_os_release() {
        let paths = HostPaths::default();
        let hal = FakeHal::new().with_file(&paths.os_release, "NAME=Kairos\nVERSION=\"v2.4.3\"\n");
        let k = detect_kairos(&hal, &paths);
        assert_eq!(k.version, "v2.4.3");
        assert_eq!(k.flavor, "");
    }

    #[test]
    fn missing_files_leave_fields_empty() {
        let hal = FakeHal::new();
        assert_eq!(detect_kairos(&hal, &HostPaths::default()), Kairos::default());
    }

    #[test]
    fn missing_key_is_an_error() {
        let paths = HostPaths::default();
        let hal = FakeHal::new()
            .with_file(&paths.kairos_release, "KAIROS_NAME=kairos\n")
            .with_file(&paths.os_release, "NAME=Kairos\n");
        assert!(matches!(
            release_lookup(&hal, &paths, "VERSION"),
            Err(HalError::Parse(_))
        ));
    }
}
