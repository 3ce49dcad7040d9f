use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use biosim::scenario::ScenarioLoader;

#[derive(Debug, Parser)]
#[command(author, version, about = "Rossumøya predator-prey runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/rossumoya.yaml")]
    scenario: PathBuf,

    /// Override year count (uses scenario default when omitted)
    #[arg(long)]
    years: Option<u32>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the final animal distribution as JSON
    #[arg(long)]
    distribution_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(scenario.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut simulation = scenario.build_simulation(cli.seed)?;
    let years = scenario.years(cli.years);
    simulation.run(years);

    let census = simulation.census();
    if let Some(path) = cli.distribution_out {
        let json = serde_json::to_string_pretty(&census)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write census to {}", path.display()))?;
    }

    println!(
        "Scenario '{}' completed after {} years. Animals: {} ({:?})",
        scenario.name, census.year, census.total, census.per_species
    );
    Ok(())
}
