//! kanban CLI: run flow scenarios and print their metrics.

use clap::{Parser, Subcommand};
use kanban_flow::config::Config;
use kanban_flow::playback;
use kanban_flow::scenario::{ScenarioConfig, ScenarioInput, load_scenarios};
use kanban_flow::simulation::{Report, Simulation};
use kanban_flow::telemetry::{TelemetryConfig, init_telemetry};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "kanban", about = "Simulate work flowing across a kanban board")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scenario described by flags
    Run {
        /// Comma-separated worker names, one skill each (e.g. "ux, dev, dev")
        #[arg(long)]
        workers: String,
        /// Comma-separated `skill: effort` pairs (e.g. "ux: 1, dev: 2")
        #[arg(long)]
        workload: String,
        /// Number of stories in the backlog
        #[arg(long)]
        stories: Option<String>,
        /// Maximum items in progress ("none" for unlimited)
        #[arg(long)]
        wip_limit: Option<String>,
        /// Randomize each story's effort around the workload
        #[arg(long)]
        random: bool,
        /// Seed for randomized effort
        #[arg(long)]
        seed: Option<u64>,
        /// Speed factor (overrides KANBAN_SPEED)
        #[arg(long)]
        speed: Option<f64>,
        /// Scenario title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run every scenario in a TOML file, one after another
    File {
        /// Path to a file of [[scenario]] tables
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args, Clone, Copy)]
struct OutputArgs {
    /// Print every event as a JSON line
    #[arg(long)]
    events: bool,
    /// Play the run back in real time instead of jumping to the end
    #[arg(long)]
    realtime: bool,
    /// Wall-clock milliseconds per playback tick
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "kanban".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Run {
            workers,
            workload,
            stories,
            wip_limit,
            random,
            seed,
            speed,
            title,
            output,
        } => {
            let input = ScenarioInput {
                title,
                workers,
                workload,
                wip_limit,
                number_of_stories: stories,
                random,
                seed: seed.or(config.seed),
                speed: Some(speed.unwrap_or(config.speed)),
            };
            let scenario = ScenarioConfig::parse(&input)?;
            cmd_run(&scenario, output).await
        }
        Command::File { path, output } => {
            let scenarios = load_scenarios(&path)?;
            if scenarios.is_empty() {
                anyhow::bail!("no [[scenario]] tables in {}", path.display());
            }
            for scenario in &scenarios {
                cmd_run(scenario, output).await?;
            }
            Ok(())
        }
    }
}

async fn cmd_run(scenario: &ScenarioConfig, output: OutputArgs) -> anyhow::Result<()> {
    let mut sim = scenario.run();

    if output.events {
        // Events from setup were delivered before we could subscribe.
        for event in sim.board().events().history() {
            println!("{}", serde_json::to_string(event)?);
        }
        sim.board_mut().subscribe(|event| {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
        });
    }

    if output.realtime {
        playback::play(&mut sim, Duration::from_millis(output.tick_ms), |sim| {
            if !output.events && !output.json {
                print_progress(sim);
            }
        })
        .await;
    } else {
        sim.run_to_completion();
    }

    let report = sim.finish();
    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_progress(sim: &Simulation) {
    let stats = sim.stats_snapshot();
    let board = sim.board();
    println!(
        "t={:>8.1}s  wip={:<3}  done={}/{}  throughput={:.2}/day  lead time={:.6} days",
        stats.time_worked,
        stats.wip,
        board.done_stage().size(),
        board.size(),
        stats.throughput,
        stats.lead_time,
    );
}

fn print_report(report: &Report) {
    println!(
        "Scenario {}: {} ({} at {:.1}s)",
        report.scenario_id,
        report.title,
        report.outcome,
        report.finished_at as f64 / 1000.0
    );
    println!("{}", "-".repeat(60));

    println!("{:<16}  {:<10}  ITEMS", "STAGE", "SKILL");
    for column in &report.board.columns {
        println!(
            "{:<16}  {:<10}  {}",
            column.name,
            column.necessary_skill.as_deref().unwrap_or("-"),
            column.items.len()
        );
    }

    println!();
    println!("Finished:   {}", report.finished_items);
    println!("Throughput: {:.2} items/day", report.stats.throughput);
    println!("Lead time:  {:.6} days", report.stats.lead_time);
    println!("WIP:        {} (peak {})", report.stats.wip, report.peak_wip);
    println!("Time:       {:.1}s", report.stats.time_worked);
    for (name, busy) in &report.stats.workers {
        println!("Worker {name:<10} {busy}%");
    }
    println!();
}
