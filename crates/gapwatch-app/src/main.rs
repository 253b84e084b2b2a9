// gapwatch entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Initialize tracing (log to file, console is for command output)
// 3. Load config (copying defaults/ on first run)
// 4. Build the workflow and create data directories
// 5. Dispatch the subcommand

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use gapwatch_app::api::{self, AppState};
use gapwatch_app::config;
use gapwatch_app::report::format_leaderboard;
use gapwatch_app::workflow::Workflow;
use gapwatch_core::Pipeline;
use tracing::info;

/// Track hitters whose results trail (or beat) their expected wOBA.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a raw Statcast CSV and compute rolling stats.
    Process {
        #[arg(long)]
        input: PathBuf,
    },
    /// Rank the latest processed batch and print the underestimated board.
    Rank,
    /// Write per-player plot series for the latest processed batch.
    Plots,
    /// Write the daily HTML report.
    Report {
        /// Report date (YYYY-MM-DD); defaults to the latest date in the data.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Process, rank, plot and report in one pass.
    Run {
        #[arg(long)]
        input: PathBuf,
    },
    /// Serve the JSON API.
    Serve {
        /// Overrides `server.port` from the config.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Write a synthetic season into the raw data directory.
    Generate {
        #[arg(long)]
        season: i32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse the command line
    let cli = Cli::parse();

    // 2. Initialize tracing
    init_tracing()?;
    info!("gapwatch starting up");

    // 3. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: season {}, window {}, top {}",
        config.season.year, config.pipeline.window, config.pipeline.leaderboard_size
    );

    // 4. Build the workflow
    let workflow = Workflow::new(config)?;
    workflow.ensure_dirs()?;

    // 5. Dispatch
    match cli.command {
        Commands::Process { input } => {
            let (path, enriched) = workflow.process(&input)?;
            println!("Processed {} plate appearances into {}", enriched.len(), path.display());
        }
        Commands::Rank => {
            let boards = workflow.rank()?;
            print!("{}", format_leaderboard(&boards.underestimated));
        }
        Commands::Plots => {
            let written = workflow.plots()?;
            println!("Wrote {} plot series", written.len());
        }
        Commands::Report { date } => {
            let path = workflow.report(date)?;
            println!("Report written to {}", path.display());
        }
        Commands::Run { input } => {
            let summary = workflow.run(&input)?;
            print!("{}", format_leaderboard(&summary.leaderboards.underestimated));
            println!("Processed batch: {}", summary.processed_file.display());
            println!("Plot series: {}", summary.plot_files.len());
            match summary.report_file {
                Some(path) => println!("Report: {}", path.display()),
                None => println!("No report: nothing was ranked"),
            }
        }
        Commands::Serve { port } => {
            let server = &workflow.config().server;
            let host: std::net::IpAddr = server
                .host
                .parse()
                .with_context(|| format!("invalid server.host `{}`", server.host))?;
            let addr = SocketAddr::new(host, port.unwrap_or(server.port));
            let state = AppState {
                processed_dir: workflow.config().paths.processed_dir.clone(),
                pipeline: Pipeline::new(workflow.config().pipeline_config())?,
            };
            println!("Serving on http://{addr}");
            api::serve(addr, state).await?;
        }
        Commands::Generate { season, seed } => {
            let path = workflow.generate(season, seed)?;
            println!("Synthetic season written to {}", path.display());
        }
    }

    info!("gapwatch finished");
    Ok(())
}

/// Initialize tracing to log to `logs/gapwatch.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("gapwatch.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gapwatch=info,gapwatch_app=info,gapwatch_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
