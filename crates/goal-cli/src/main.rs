//! goal-cli: evaluate financial goals from JSON files.
//!
//! Usage:
//!   cargo run -p goal-cli -- metrics scenario.json
//!   cargo run -p goal-cli -- simulate scenario.json --trials 10000
//!   cargo run -p goal-cli -- paths scenario.json --paths 200
//!   cargo run -p goal-cli -- rescue scenario.json
//!   cargo run -p goal-cli -- dashboard household.json --simulate

mod household;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use goal_engine::{
    AllocationSnapshot, EngineConfig, GoalMetricsAggregator, RescueStrategyGenerator, RunOptions,
    SimulationRequest, StochasticProjector,
};
use goal_planner::GoalPlanner;
use serde::Serialize;

use household::{read_json, Household, Scenario};

/// Investments listed in each performer ranking.
const PERFORMER_LIMIT: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goal_cli=info,goal_planner=info,goal_engine=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (Some(command), Some(path)) = (args.get(1), args.get(2)) else {
        usage();
    };
    let path = PathBuf::from(path);

    let flag_value = |name: &str| -> Option<u32> {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .and_then(|v| v.parse().ok())
    };

    let config = EngineConfig::from_env();
    tracing::info!(
        trials = config.default_trials,
        batch_size = config.batch_size,
        seed = ?config.seed,
        "goal-cli: {} {}",
        command,
        path.display()
    );

    match command.as_str() {
        "metrics" | "simulate" | "paths" | "rescue" => {
            let scenario: Scenario = read_json(&path)?;
            let output = run_scenario(command, scenario, &config, &flag_value)?;
            println!("{output}");
        }
        "dashboard" => {
            let household: Household = read_json(&path)?;
            let simulate = args.iter().any(|a| a == "--simulate");
            let output = run_dashboard(household, config, simulate).await?;
            println!("{output}");
        }
        _ => usage(),
    }
    Ok(())
}

fn run_scenario(
    command: &str,
    scenario: Scenario,
    config: &EngineConfig,
    flag_value: &dyn Fn(&str) -> Option<u32>,
) -> Result<String> {
    let snapshot =
        AllocationSnapshot::from_holdings(&scenario.holdings).context("invalid holdings")?;
    let metrics =
        GoalMetricsAggregator::compute(&scenario.goal, &snapshot, scenario.success_probability)
            .context("invalid goal scenario")?;
    let request = SimulationRequest::for_goal(
        &scenario.goal,
        metrics.current_allocation,
        metrics.required_monthly_contribution,
    );
    let projector = StochasticProjector::from_config(config);
    let options = RunOptions::from_config(config);

    match command {
        "metrics" => pretty(&metrics),
        "simulate" => {
            let trials = flag_value("--trials").unwrap_or(config.default_trials);
            let result = projector.simulate(&request, trials, &options)?;
            pretty(&result)
        }
        "paths" => {
            let paths = flag_value("--paths").unwrap_or(config.projection_paths);
            pretty(&projector.project_paths(&request, paths, &options)?)
        }
        "rescue" => {
            let strategies =
                RescueStrategyGenerator::from_config(config).generate(&scenario.goal, &metrics, &options)?;
            pretty(&strategies)
        }
        _ => usage(),
    }
}

async fn run_dashboard(household: Household, config: EngineConfig, simulate: bool) -> Result<String> {
    let user_id = household.user_id;
    let (store, goal_ids) = household.into_store().await?;
    let planner = GoalPlanner::new(Arc::new(store), config);

    if simulate {
        let today = Utc::now().date_naive();
        for goal_id in &goal_ids {
            planner.run_simulation(*goal_id, None).await?;
            planner.record_history_snapshot(*goal_id, today).await?;
        }
    }

    let report = serde_json::json!({
        "dashboard": planner.dashboard(user_id).await?,
        "member_allocation": planner.member_allocation(user_id).await?,
        "top_performers": planner.top_performers(user_id, PERFORMER_LIMIT).await?,
        "worst_performers": planner.worst_performers(user_id, PERFORMER_LIMIT).await?,
    });
    pretty(&report)
}

fn pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output")
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  goal-cli metrics FILE                 Present value, shortfall and status");
    eprintln!("  goal-cli simulate FILE [--trials N]   Monte Carlo outcome distribution");
    eprintln!("  goal-cli paths FILE [--paths N]       Monthly percentile paths");
    eprintln!("  goal-cli rescue FILE                  Alternative strategies for a lagging goal");
    eprintln!("  goal-cli dashboard FILE [--simulate]  Household dashboard");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GOAL_ENGINE_TRIALS, GOAL_ENGINE_RESCUE_TRIALS, GOAL_ENGINE_PATHS,");
    eprintln!("  GOAL_ENGINE_BATCH_SIZE, GOAL_ENGINE_SEED, GOAL_ENGINE_TIMEOUT_MS");
    std::process::exit(1);
}
