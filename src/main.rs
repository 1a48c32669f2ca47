use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use homestead::{
    engine::EngineBuilder,
    scenario::ScenarioLoader,
    systems::{AgentSystem, DayCycleSystem, QuestSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Homestead settlement simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/hamlet.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Print the final town snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let mut world = scenario.build_world()?;
    let ticks = scenario.ticks(cli.ticks);

    let mut engine = EngineBuilder::new(scenario.engine_settings())
        .with_system(AgentSystem::new())
        .with_system(DayCycleSystem::new())
        .with_system(QuestSystem::new())
        .build();

    engine.run(&mut world, ticks)?;
    let snapshot = world.snapshot();
    if cli.json {
        let json = serde_json::to_string_pretty(&snapshot).context("Failed to encode snapshot")?;
        println!("{json}");
    } else {
        println!(
            "Scenario '{}' completed for {} ticks (day {}). Population {}/{}, food {} wood {} stone {}, efficiency {:.2}",
            scenario.name,
            ticks,
            snapshot.day,
            snapshot.population,
            snapshot.max_population,
            snapshot.resources.food,
            snapshot.resources.wood,
            snapshot.resources.stone,
            snapshot.production_efficiency,
        );
        if let Some(quest) = &snapshot.quest {
            println!("Current quest: {} ({}/{})", quest.title, quest.progress, quest.target);
        }
        if snapshot.victory {
            println!("Victory!");
        }
    }
    Ok(())
}
