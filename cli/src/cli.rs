use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use domain::schedule::StrategyTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyCli {
    Lpt,
    Spt,
    Cfs,
    Smart,
    Hybrid,
    Milp,
}

#[derive(Debug, Parser)]
#[clap(name = "fillsched", version, about = "Fill-lot schedule planner")]
pub struct Cli {
    /// Path to a JSON array of lots: [{"id", "product_type", "vials"}]
    #[clap(long)]
    pub input: PathBuf,

    /// Strategies to run (comma-separated). One prints its schedule;
    /// several print a ranked comparison report.
    #[clap(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [StrategyCli::Lpt]
    )]
    pub strategies: Vec<StrategyCli>,

    /// Optional JSON config preset; fields mirror ScheduleConfig.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Override the number of filling lines.
    #[clap(long)]
    pub lines: Option<u32>,

    /// Override the per-strategy timeout in seconds.
    #[clap(long)]
    pub timeout_secs: Option<u64>,

    /// Emit logs as JSON.
    #[clap(long)]
    pub json_logs: bool,
}

/// Convert CLI strategy selection to the engine's tag enum.
pub(crate) fn to_tag(strategy: StrategyCli) -> StrategyTag {
    match strategy {
        StrategyCli::Lpt => StrategyTag::Lpt,
        StrategyCli::Spt => StrategyTag::Spt,
        StrategyCli::Cfs => StrategyTag::Cfs,
        StrategyCli::Smart => StrategyTag::Smart,
        StrategyCli::Hybrid => StrategyTag::Hybrid,
        StrategyCli::Milp => StrategyTag::Milp,
    }
}
