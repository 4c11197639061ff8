//! Snapshot assembly and rendering.

use crate::boot::{detect_boot_with_fs, Boot};
use crate::config::Config;
use crate::facts::{FactsProvider, SysinfoFacts};
use crate::kairos::{detect_kairos, Kairos};
use crate::partition::{PartitionResolver, PartitionState, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use state_error::{StateError, StateResult};
use state_hal::{LinuxHal, StateHal};
use std::fmt;
use uuid::Uuid;

/// Point-in-time view of boot mode and partition layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Runtime {
    pub uuid: String,
    pub persistent: PartitionState,
    pub recovery: PartitionState,
    pub oem: PartitionState,
    pub state: PartitionState,
    #[serde(rename = "boot")]
    pub boot_state: Boot,
    /// Hardware/OS facts, not interpreted here.
    pub system: Value,
    pub kairos: Kairos,
}

impl Runtime {
    /// Snapshot the running host.
    ///
    /// The runtime is always returned. An error means block enumeration failed: partition
    /// data is then unreliable (all roles not found) while everything else is usable.
    pub fn detect() -> (Runtime, StateResult<()>) {
        let config = Config::default().with_env_overrides();
        let hal = LinuxHal::with_paths(config.paths.clone());
        let facts = SysinfoFacts::new(config.paths.clone());
        Self::detect_with(&hal, &facts, &config)
    }

    pub fn detect_with<H: StateHal + ?Sized>(
        hal: &H,
        facts: &dyn FactsProvider,
        config: &Config,
    ) -> (Runtime, StateResult<()>) {
        let boot_state =
            detect_boot_with_fs(hal, &config.paths.proc_cmdline).unwrap_or_else(|err| {
                log::debug!("boot state unknown: {}", err);
                Boot::Unknown
            });
        let mut runtime = Runtime {
            uuid: config
                .snapshot_uuid
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            boot_state,
            system: facts.facts(),
            kairos: detect_kairos(hal, &config.paths),
            ..Runtime::default()
        };

        let resolver = match PartitionResolver::new(hal, &config.labels) {
            Ok(resolver) => resolver,
            Err(err) => {
                log::warn!("block device enumeration failed: {}", err);
                return (runtime, Err(StateError::Enumeration(err)));
            }
        };
        for role in Role::ALL {
            *runtime.partition_mut(role) = resolver.resolve(role);
        }
        (runtime, Ok(()))
    }

    pub fn partition(&self, role: Role) -> &PartitionState {
        match role {
            Role::Persistent => &self.persistent,
            Role::Recovery => &self.recovery,
            Role::Oem => &self.oem,
            Role::State => &self.state,
        }
    }

    fn partition_mut(&mut self, role: Role) -> &mut PartitionState {
        match role {
            Role::Persistent => &mut self.persistent,
            Role::Recovery => &mut self.recovery,
            Role::Oem => &mut self.oem,
            Role::State => &mut self.state,
        }
    }

    /// YAML rendering; empty if serialization fails.
    pub fn to_yaml_string(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_else(|err| {
            log::warn!("cannot render snapshot: {}", err);
            String::new()
        })
    }

    pub fn to_json_string(&self, pretty: bool) -> StateResult<String> {
        let rendered = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        rendered.map_err(|e| StateError::Serialization(e.to_string()))
    }

    /// Normalized value tree the query engine runs against.
    pub fn to_value(&self) -> StateResult<Value> {
        serde_json::to_value(self).map_err(|e| StateError::Serialization(e.to_string()))
    }

    /// Evaluate a jq-style path/filter against this snapshot.
    ///
    /// Every emitted value is concatenated without a separator.
    pub fn query(&self, expr: &str) -> StateResult<String> {
        crate::query::run(&self.to_value()?, expr)
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_yaml_string())
    }
}
