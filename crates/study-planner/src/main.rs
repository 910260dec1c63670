// study-planner/crates/study-planner/src/main.rs

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use study_planner::{config::Config, planner_db::seed::seed_sample_data, run_server, server::open_database};

#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "study-planner", version, about = "Study planner API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[cfg(feature = "cli")]
#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Apply migrations and insert the sample planner
    Seed,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(cfg).await,
        Command::Seed => {
            study_planner::telemetry::init_tracing();
            let db = open_database(&cfg)?;
            let report = seed_sample_data(&db, &cfg.user_context())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
