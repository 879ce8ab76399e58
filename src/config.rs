use crate::common::{ConflictChoice, CostFunction};
use crate::solver::ExpansionMode;

use anyhow::anyhow;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "Rust MAM CBS",
    about = "Conflict-based search for multi-agent meeting in Rust.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to the YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to the YAML instance file")]
    pub instance_path: Option<String>,

    #[arg(long, value_enum, help = "Joint cost to minimize")]
    pub cost_function: Option<CostFunction>,

    #[arg(long, help = "Time budget of the whole search in milliseconds")]
    pub time_limit_ms: Option<u64>,

    #[arg(long, help = "Constraint tree nodes above this cost are not generated")]
    pub max_cost: Option<usize>,

    #[arg(long, value_enum, help = "Rule used to pick the conflict to branch on")]
    pub conflict_choice: Option<ConflictChoice>,

    #[arg(long, value_enum, help = "Generate both children at once or one at a time")]
    pub expansion: Option<ExpansionMode>,

    #[arg(long, help = "Print the result as JSON", default_value_t = false)]
    pub output_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub instance_path: String,
    pub cost_function: CostFunction,
    pub time_limit_ms: u64,
    pub max_cost: Option<usize>,
    pub conflict_choice: ConflictChoice,
    pub expansion: ExpansionMode,
    pub output_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            instance_path: "instances/open-5-5.yaml".to_string(),
            cost_function: CostFunction::SumOfCosts,
            time_limit_ms: 300_000,
            max_cost: None,
            conflict_choice: ConflictChoice::First,
            expansion: ExpansionMode::Full,
            output_json: false,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(instance_path) = &cli.instance_path {
            self.instance_path = instance_path.clone();
        }
        if let Some(cost_function) = cli.cost_function {
            self.cost_function = cost_function;
        }
        if let Some(time_limit_ms) = cli.time_limit_ms {
            self.time_limit_ms = time_limit_ms;
        }
        if cli.max_cost.is_some() {
            self.max_cost = cli.max_cost;
        }
        if let Some(conflict_choice) = cli.conflict_choice {
            self.conflict_choice = conflict_choice;
        }
        if let Some(expansion) = cli.expansion {
            self.expansion = expansion;
        }
        self.output_json |= cli.output_json;

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.instance_path.is_empty() {
            return Err(anyhow!("Instance path must not be empty"));
        }

        if self.time_limit_ms == 0 {
            return Err(anyhow!("Time limit must be greater than 0 ms"));
        }

        Ok(())
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }
}
