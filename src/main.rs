// src/main.rs
//! Diagnostics entry point for the service container.
use anyhow::Result;
use blend_services::config::apply_env_overrides;
use blend_services::core::config::{AppConfig, NetworkSelector};
use blend_services::service::{MarketService, ServiceContainer};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "blend-services")]
#[command(about = "Inspect the Blend client service container")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured network (testnet or mainnet)
    #[arg(long)]
    network: Option<NetworkSelector>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every slot and report which ones resolved
    Slots,
    /// Print the effective configuration
    Config,
    /// Fetch the price of an asset and convert a supply APR to APY
    Quote {
        /// Asset code, e.g. XLM
        asset: String,
        /// Supply APR as a fraction, e.g. 0.05
        #[arg(long, default_value = "0")]
        apr: Decimal,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    let config = load_config(&args)?;
    info!("Starting blend-services v{} on {}", env!("CARGO_PKG_VERSION"), config.network);

    match args.command {
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Commands::Slots => {
            let container = ServiceContainer::new(config);
            let warm_up = container.warm_up();
            let report = json!({
                "registered": container.registered_slots(),
                "resolved": container.resolved_slots(),
                "state": container.initialization_state(),
                "error": warm_up.as_ref().err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            warm_up?;
        }
        Commands::Quote { asset, apr } => {
            let container = Arc::new(ServiceContainer::new(config));
            let market = MarketService::new(&container);
            let quote = market.quote(&asset, apr).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    if let Some(network) = args.network {
        config.network = network;
    }
    Ok(config)
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
