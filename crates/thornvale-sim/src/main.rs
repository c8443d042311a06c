//! # Thornvale Sim
//!
//! Headless runner for Thornvale encounters.
//!
//! ```text
//! thornvale-sim [CONFIG] [--scenario NAME] [--json]
//! thornvale-sim [CONFIG] --init
//! ```
//!
//! Reads a TOML run configuration (default `thornvale-sim.toml`), builds the
//! encounter, lets the autopilot play it out and prints a summary. `--init`
//! writes the default configuration instead.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod encounter;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{RunConfig, Scenario, CONFIG_FILE};
use encounter::Encounter;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "thornvale-sim", version)]
#[command(about = "Plays a scripted Thornvale encounter and prints the summary")]
struct Args {
    /// Run configuration file
    config: Option<PathBuf>,

    /// Encounter to run instead of the one in the config
    #[arg(long, value_enum)]
    scenario: Option<Scenario>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Write the default configuration and exit
    #[arg(long)]
    init: bool,
}

/// Main entry point.
fn main() -> Result<()> {
    // Logs go to stderr so the summary can be piped
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("thornvale=info".parse()?))
        .init();

    info!("Thornvale sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let path = args.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    if args.init {
        RunConfig::default().save_to(&path)?;
        return Ok(());
    }

    let mut config = RunConfig::load_from(&path);
    if let Some(scenario) = args.scenario {
        config.scenario = scenario;
    }
    config.json |= args.json;
    config.validate();

    let encounter = Encounter::build(&config)?;
    info!(
        scenario = ?config.scenario,
        enemies = encounter.simulation().enemies().len(),
        "running for {}s",
        config.duration
    );
    let summary = encounter.run();
    if config.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("thornvale-sim").chain(args.iter().copied()))
    }

    #[test]
    fn test_args_default() {
        let args = parse(&[]).expect("parse");
        assert!(args.config.is_none());
        assert!(args.scenario.is_none());
        assert!(!args.json);
        assert!(!args.init);
    }

    #[test]
    fn test_args_all_flags() {
        let args = parse(&["run.toml", "--scenario", "jungle_boss", "--json"]).expect("parse");
        assert_eq!(args.config, Some(PathBuf::from("run.toml")));
        assert_eq!(args.scenario, Some(Scenario::JungleBoss));
        assert!(args.json);
    }

    #[test]
    fn test_args_init() {
        let args = parse(&["--init", "custom.toml"]).expect("parse");
        assert!(args.init);
        assert_eq!(args.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_args_rejects_bad_input() {
        assert!(parse(&["--scenario", "dragon"]).is_err());
        assert!(parse(&["--scenario"]).is_err());
        assert!(parse(&["--fast"]).is_err());
        assert!(parse(&["a.toml", "b.toml"]).is_err());
        assert!(parse(&["--scenario", "village-boss"]).is_err());
    }

    #[test]
    fn test_args_every_scenario_name() {
        for (name, scenario) in [
            ("grunt", Scenario::Grunt),
            ("squad", Scenario::Squad),
            ("drones", Scenario::Drones),
            ("village_boss", Scenario::VillageBoss),
            ("jungle_boss", Scenario::JungleBoss),
            ("gauntlet", Scenario::Gauntlet),
        ] {
            let args = parse(&["--scenario", name]).expect("parse");
            assert_eq!(args.scenario, Some(scenario));
        }
    }
}
