//! VOXA Bridge server

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use voxa_bridge::BridgeConfig;

#[derive(Parser)]
#[command(name = "voxa-bridge")]
#[command(about = "VOXA bridge - delivers agent instructions to the web-ui backend")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "voxa-bridge.toml")]
    config: PathBuf,

    /// HTTP listen address
    #[arg(short, long)]
    listen: Option<String>,

    /// Gradio web-ui backend URL
    #[arg(long)]
    webui_url: Option<String>,

    /// Direct web-ui API server URL
    #[arg(long)]
    webui_api_url: Option<String>,

    /// Refuse to dispatch while the web-ui backend is down
    #[arg(long)]
    preflight: bool,

    /// Skip the Playwright UI-automation strategy
    #[arg(long)]
    no_automation: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    info!("VOXA bridge v{}", env!("CARGO_PKG_VERSION"));

    let mut config = BridgeConfig::load(&cli.config)?;
    config.apply_env();
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(url) = cli.webui_url {
        config.webui_base_url = url;
    }
    if let Some(url) = cli.webui_api_url {
        config.direct_api_url = url;
    }
    if cli.preflight {
        config.preflight_check = true;
    }
    if cli.no_automation {
        config.automation.enabled = false;
    }
    config.validate()?;

    let addr: SocketAddr = config.listen.parse()?;
    info!(
        "Forwarding to web-ui {} (direct API: {})",
        config.webui_base_url, config.direct_api_url
    );

    voxa_bridge::server::serve(addr, &config).await
}
