//! Sentinel CLI - Command-line interface for the Sentinel health engine.
//!
//! Provides commands for health probes, check management, alerts, history,
//! metrics and local configuration.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{alerts, checks, config, health, history};
use output::OutputFormat;

/// Sentinel - Health monitoring engine CLI
#[derive(Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Sentinel - Health monitoring engine",
    long_about = "CLI tool for inspecting and managing a running Sentinel health engine.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "SENTINEL_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check system health
    Health(health::HealthArgs),

    /// Check management operations
    #[command(subcommand)]
    Checks(checks::CheckCommands),

    /// Alert operations
    #[command(subcommand)]
    Alerts(alerts::AlertCommands),

    /// Recent aggregate health evaluations
    History(history::HistoryArgs),

    /// Uptime over the retained history
    Uptime(history::UptimeArgs),

    /// Resource and request metrics
    Metrics,

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(config::load_api_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = client::ApiClient::new(&api_url)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Health(args) => health::execute(args, &client, format).await,
        Commands::Checks(cmd) => checks::execute(cmd, &client, format).await,
        Commands::Alerts(cmd) => alerts::execute(cmd, &client, format).await,
        Commands::History(args) => history::history(args, &client, format).await,
        Commands::Uptime(args) => history::uptime(args, &client, format).await,
        Commands::Metrics => health::metrics(&client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
