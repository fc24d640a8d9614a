//! tekiji-bot entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tekiji_bot::config::resolve_config_path;
use tekiji_bot::{AppConfig, Application, Role};
use tekiji_broker::{ApiKey, API_KEY_ENV_VARS};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Timely-disclosure trading bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TEKIJI_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan disclosures once a minute and submit entry orders
    Entry,
    /// Cancel unfilled buy orders past the age threshold
    Reaper,
    /// Run stop-loss rewrites and profit-target sells
    Exit,
    /// Validate configuration and print the effective settings
    CheckConfig,
}

fn require_api_key() -> Result<ApiKey> {
    ApiKey::from_env().with_context(|| {
        format!(
            "broker API key not set (tried {})",
            API_KEY_ENV_VARS.join(", ")
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal in production.
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();
    let config_path = resolve_config_path(args.config, std::env::var("TEKIJI_CONFIG").ok());
    let config = AppConfig::load(&config_path)?;

    tekiji_telemetry::init_logging(&config.logging)?;
    info!("Starting tekiji-bot v{}", env!("CARGO_PKG_VERSION"));
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }
    info!(config_path = %config_path.display(), "Loaded configuration");

    let role = match args.command {
        Command::Entry => Role::Entry,
        Command::Reaper => Role::Reaper,
        Command::Exit => Role::Exit,
        Command::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            require_api_key()?;
            info!("Configuration OK");
            return Ok(());
        }
    };

    let api_key = require_api_key()?;
    let app = Application::new(config, api_key)?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
        signal_token.cancel();
    });

    app.run(role, shutdown).await?;
    Ok(())
}
