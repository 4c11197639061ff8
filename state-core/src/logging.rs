//! Logger setup for the CLI.
//!
//! Logs go to stderr so stdout stays clean for snapshot and query output.

use env_logger::Target;
use log::LevelFilter;

/// Map `-v` repetitions to a level filter.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialise `env_logger`. `RUST_LOG` overrides the verbosity-derived default.
pub fn init(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .target(Target::Stderr)
        .filter_level(level_for_verbosity(verbosity));
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    // A second init (e.g. from tests) is harmless.
    let _ = builder.try_init();
}
