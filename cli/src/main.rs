mod cli;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use common::logger::{TraceId, init_logger};
use domain::config::ScheduleConfig;
use domain::lot::{Lot, LotSet};

use cli::{Cli, to_tag};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logger("fillsched", args.json_logs);

    let trace_id = TraceId::default();
    info!(%trace_id, input = %args.input.display(), "loading lot set");

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let lots: Vec<Lot> =
        serde_json::from_str(&raw).context("input must be a JSON array of lots")?;
    let lots = LotSet::new(lots)?;

    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<ScheduleConfig>(&raw).context("parsing config preset")?
        }
        None => ScheduleConfig::default(),
    };
    if let Some(lines) = args.lines {
        config.num_lines = lines;
    }
    if let Some(timeout) = args.timeout_secs {
        config.strategy_timeout_secs = timeout;
    }
    config.validate()?;

    if let [only] = args.strategies.as_slice() {
        let schedule = engine::schedule(&lots, &config, to_tag(*only))?;
        println!("{}", serde_json::to_string_pretty(&schedule)?);
    } else {
        let tags: Vec<_> = args.strategies.iter().copied().map(to_tag).collect();
        let report = engine::compare(&lots, &config, &tags).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
