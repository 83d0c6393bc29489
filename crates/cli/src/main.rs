//! VOXA CLI - Main Entry Point

use clap::{Parser, Subcommand};

use voxa_cli::client::BridgeClient;
use voxa_cli::commands::{agent, status, task};
use voxa_cli::output;
use voxa_common::{DispatchStatus, DEFAULT_BRIDGE_URL};

/// VOXA CLI - drive browser-automation agents through the bridge
#[derive(Parser)]
#[command(name = "voxa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Bridge server address
    #[arg(long, env = "VOXA_BRIDGE_URL", default_value = DEFAULT_BRIDGE_URL, global = true)]
    bridge_url: String,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check which VOXA services are running
    Status(status::StatusArgs),

    /// Start an agent with a natural-language instruction
    Start(agent::StartArgs),

    /// Show the status of a task
    Task(task::TaskArgs),

    /// Stop an agent task
    Stop {
        /// Task ID
        task_id: String,
    },

    /// List available agents
    Agents,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let client = BridgeClient::new(&cli.bridge_url)?;

    match cli.command {
        Commands::Status(args) => {
            if !status::execute(args, client.base_url(), cli.format).await? {
                std::process::exit(1);
            }
        }
        Commands::Start(args) => {
            let outcome = agent::start(args, &client, cli.format).await?;
            if outcome.status == DispatchStatus::Error {
                std::process::exit(1);
            }
        }
        Commands::Task(args) => task::execute(args, &client, cli.format).await?,
        Commands::Stop { task_id } => agent::stop(&task_id, &client, cli.format).await?,
        Commands::Agents => agent::agents(&client, cli.format).await?,
    }

    Ok(())
}
