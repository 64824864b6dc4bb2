use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use frontier::{
    action_log::ActionLog,
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    systems::{ArmySystem, CitySystem},
    World,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless two-faction territory simulator")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, conflicts_with = "config")]
    scenario: Option<PathBuf>,

    /// Legacy `name = 'value'` config file (use with --map)
    #[arg(long, requires = "map")]
    config: Option<PathBuf>,

    /// Map file for a legacy config
    #[arg(long, requires = "config")]
    map: Option<PathBuf>,

    /// Where the action log is written
    #[arg(long, default_value = "action_list.txt")]
    output: PathBuf,

    /// Override turn count
    #[arg(long)]
    turns: Option<u64>,

    /// Override random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the end-of-run summary as JSON
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Diagnostic log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("frontier={}", cli.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let loader = ScenarioLoader::new(".");
    let mut scenario = match (&cli.config, &cli.map) {
        (Some(config), Some(map)) => loader.load_legacy(config, map)?,
        _ => {
            let path = cli
                .scenario
                .clone()
                .unwrap_or_else(|| PathBuf::from("scenarios/skirmish.yaml"));
            loader.load(&path)?
        }
    };
    if let Some(turns) = cli.turns {
        scenario.turns = turns;
    }
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }

    let log = ActionLog::create(&cli.output)?;
    let grid = scenario.build_grid()?;
    let mut world = World::new(grid, log);

    let settings = EngineSettings {
        seed: scenario.seed,
        rules: scenario.rules(),
    };
    let mut engine = EngineBuilder::new(settings)
        .with_system(CitySystem::new())
        .with_system(ArmySystem::new())
        .build();

    let summary = engine
        .run(&mut world)
        .with_context(|| format!("scenario '{}' failed", scenario.name))?;

    if let Some(path) = &cli.summary {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary {}", path.display()))?;
    }

    println!(
        "Scenario '{}' completed {} turns; {} actions written to {}",
        scenario.name,
        summary.turns_simulated,
        summary.log_lines,
        cli.output.display()
    );
    for player in &summary.players {
        println!(
            "  colour {}: {} cities, {} roads, {} armies ({} raised)",
            player.color, player.cities, player.roads, player.armies, player.armies_created
        );
    }
    Ok(())
}
