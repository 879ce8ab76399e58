use mam_cbs::config::{Cli, Config};
use mam_cbs::scenario::Scenario;
use mam_cbs::solver::{MeetingPointOracle, CBS};

use anyhow::{ensure, Context};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let instance = Scenario::load_from_file(&config.instance_path)
        .with_context(|| format!("error loading instance: {}", config.instance_path))?
        .into_instance()
        .with_context(|| format!("invalid instance: {}", config.instance_path))?;

    let oracle = MeetingPointOracle::new(&instance, config.cost_function);
    let mut cbs_solver = CBS::new(instance.clone(), oracle, &config);
    cbs_solver.setup();

    if cbs_solver.solve() {
        if let Some(plan) = cbs_solver.plan() {
            ensure!(
                plan.verify(&instance.map, &instance.agents),
                "cbs returned an invalid joint plan"
            );
        }
    } else {
        error!(
            "cbs solve fails: {:?}, cost {}",
            cbs_solver.outcome(),
            cbs_solver.solution_cost()
        );
    }

    if config.output_json {
        println!("{}", serde_json::to_string_pretty(&cbs_solver.report())?);
    } else if let Some(plan_text) = cbs_solver.plan_text() {
        println!("{plan_text}");
    }

    Ok(())
}
