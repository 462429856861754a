//! Fusion scenario CLI
//!
//! Runs the deterministic tracking scenarios and reports RMSE / NIS.

use clap::Parser;
use fusion_sim::{ScenarioId, ScenarioResult, ScenarioRunner};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Fusion EKF scenario runner
#[derive(Parser, Debug)]
#[command(name = "fusion-sim")]
#[command(about = "Run deterministic radar/laser tracking scenarios", long_about = None)]
struct Args {
    /// Noise seed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of consecutive seeds to run
    #[arg(long, default_value = "1")]
    seeds: u64,

    /// Scenario to run (straight, circle, cross_bearing_seam, close_approach, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Simulated duration in seconds
    #[arg(short, long, default_value = "20")]
    duration: f64,

    /// Package rate in Hz
    #[arg(short, long, default_value = "20")]
    rate: u32,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: straight, circle, cross_bearing_seam, close_approach, all");
                std::process::exit(2);
            }
        }
    };

    let mut results: Vec<ScenarioResult> = Vec::new();
    for seed in args.seed..args.seed.saturating_add(args.seeds) {
        let runner = ScenarioRunner::new(seed)
            .with_duration(args.duration)
            .with_rate(args.rate);

        for scenario in &scenarios {
            match runner.run(*scenario) {
                Ok(result) => {
                    if !args.json {
                        report(&result);
                    }
                    results.push(result);
                }
                Err(e) => {
                    error!("✗ {} (seed={}) aborted: {}", scenario, seed, e);
                    std::process::exit(1);
                }
            }
        }
    }

    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed,
            "failed": failed,
            "results": results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else if failed == 0 {
        info!("All {} scenario runs passed", results.len());
    } else {
        error!("{}/{} scenario runs failed", failed, results.len());
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn report(result: &ScenarioResult) {
    let mark = if result.passed { "✓" } else { "✗" };
    info!(
        "{} {} (seed={}) pos RMSE [{:.3}, {:.3}] vel RMSE [{:.3}, {:.3}]",
        mark,
        result.scenario,
        result.seed,
        result.position_rmse[0],
        result.position_rmse[1],
        result.velocity_rmse[0],
        result.velocity_rmse[1],
    );
    if let Some(reason) = &result.failure_reason {
        error!("  {}", reason);
    }
}
