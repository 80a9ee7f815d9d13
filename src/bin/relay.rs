//! Storefront Relay server
//!
//! Serves the agent stream WebSocket endpoint backed by the loopback engine.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use storefront_relay::agent::LoopbackEngine;
use storefront_relay::config::{self, Config, LogConfig, LogFormat};
use storefront_relay::gateway;
use storefront_relay::relay::RelayContext;
use storefront_relay::tools::{CachedProfileProvider, StaticProfileProvider, ToolPipeline, ToolRegistry};
use storefront_relay::VERSION;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "storefront-relay",
    author = "Storefront Relay Contributors",
    version = VERSION,
    about = "WebSocket relay between storefront clients and a conversational agent engine",
    long_about = None
)]
struct Cli {
    /// Config file (JSON5 or TOML)
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address, overrides config
    #[arg(long)]
    bind: Option<String>,

    /// Port, overrides config
    #[arg(short, long)]
    port: Option<u16>,
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_new(&log.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config: Config = match &cli.config {
        Some(path) => config::load_config_with(path)?,
        None => config::load_config()?,
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_logging(&config.log);

    let validation = config::validate_config(&config);
    for warning in &validation.warnings {
        warn!("Config warning: {}", warning);
    }
    if !validation.valid {
        for issue in &validation.errors {
            error!("Config error: {}", issue);
        }
        anyhow::bail!("invalid configuration");
    }

    let profiles = CachedProfileProvider::new(
        Arc::new(StaticProfileProvider::with_demo_customer(&config.guard.default_customer_id)),
        config.guard.profile_cache_ttl,
    );
    let pipeline = ToolPipeline::from_config(&config.guard, ToolRegistry::new(), Arc::new(profiles));
    let relay = Arc::new(RelayContext::new(
        &config,
        Arc::new(LoopbackEngine::new()),
        Arc::new(pipeline),
    ));

    info!(
        version = VERSION,
        addr = %config.server.listen_addr(),
        rate_quota = config.relay.rate_quota,
        rate_window_s = config.relay.rate_window.as_secs(),
        "Starting storefront relay"
    );
    gateway::serve(relay, &config.server, shutdown_signal()).await?;
    info!("Relay stopped");
    Ok(())
}
