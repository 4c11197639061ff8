use anyhow::Context;
use clap::Parser;
use state_core::{Config, Runtime, SysinfoFacts};
use state_hal::LinuxHal;

mod cli;

use cli::{Cli, Command, OutputFormat};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    state_core::logging::init(cli.verbose);

    let config = match &cli.root {
        Some(root) => Config::with_root(root),
        None => Config::default(),
    }
    .with_env_overrides();
    if cli.root.is_some() {
        log::info!("findmnt/lsblk fallbacks and system facts still describe the live host");
    }
    let hal = LinuxHal::with_paths(config.paths.clone());
    let facts = SysinfoFacts::new(config.paths.clone());

    let (runtime, detected) = Runtime::detect_with(&hal, &facts, &config);
    if let Err(err) = detected {
        // Partition data is unreliable, the rest of the snapshot is still printed.
        log::warn!("{}", err);
    }

    println!("{}", render(&runtime, &cli.command)?);
    Ok(())
}

fn render(runtime: &Runtime, command: &Command) -> anyhow::Result<String> {
    match command {
        Command::Show {
            output: OutputFormat::Yaml,
        } => Ok(runtime.to_yaml_string().trim_end().to_string()),
        Command::Show {
            output: OutputFormat::Json,
        } => Ok(runtime.to_json_string(true)?),
        Command::Get { query } => runtime
            .query(query)
            .with_context(|| format!("query {:?}", query)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use state_core::{Boot, Kairos};

    fn runtime() -> Runtime {
        Runtime {
            uuid: "u".to_string(),
            boot_state: Boot::Passive,
            kairos: Kairos {
                flavor: "alpine".to_string(),
                version: "v3.0.0".to_string(),
            },
            ..Runtime::default()
        }
    }

    #[test]
    fn get_renders_raw_string() {
        let get = Command::Get {
            query: "kairos.version".to_string(),
        };
        let out = render(&runtime(), &get).unwrap();
        assert_eq!(out, "v3.0.0");
    }

    #[test]
    fn get_reports_bad_query() {
        let err = render(&runtime(), &Command::Get { query: "kairos.[".to_string() }).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid query"));
    }

    #[test]
    fn show_json_and_yaml() {
        let rt = runtime();
        let json = render(&rt, &Command::Show { output: OutputFormat::Json }).unwrap();
        assert!(json.contains("\"boot\": \"passive_boot\""));
        let yaml = render(&rt, &Command::Show { output: OutputFormat::Yaml }).unwrap();
        assert!(yaml.starts_with("uuid: u"));
        assert!(!yaml.ends_with('\n'));
    }
}
