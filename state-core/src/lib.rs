//! Kairos state core library.
//!
//! `state-core` classifies the boot mode, resolves the well-known partitions
//! (persistent, recovery, OEM, state) across sysfs, `findmnt` and `lsblk`, and
//! exposes the resulting snapshot as YAML, JSON, or through a jq-style query.

pub mod boot;
pub mod config;
pub mod facts;
pub mod kairos;
pub mod logging;
pub mod partition;
pub mod query;
pub mod runtime;

#[cfg(test)]
pub mod test_env;

pub use boot::Boot;
pub use config::Config;
pub use facts::{FactsProvider, StaticFacts, SysinfoFacts};
pub use kairos::Kairos;
pub use partition::{PartitionResolver, PartitionState, Role, RoleLabels};
pub use runtime::Runtime;
pub use state_error::{HalError, StateError, StateResult};
