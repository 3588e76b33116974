//! Accounts and attachments HTTP service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use rust_accounts::account::SledAccountStore;
use rust_accounts::api::{ApiServer, AppState};
use rust_accounts::attachment::RocksAttachmentStore;
use rust_accounts::config::AppConfig;
use rust_accounts::events::{EventPublisher, LogPublisher, WebhookPublisher};

/// Server command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rust_accounts", version, about = "Account and attachment API server")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "accounts.toml")]
    config: String,

    /// Listen address, overriding the configured one
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match AppConfig::load_or_default(&cli.config) {
        Ok(config) => config.with_env_overrides(),
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e.into());
    }

    info!("🚀 Starting account service");
    info!("Accounts DB: {}", config.storage.accounts_path);
    info!("Attachments DB: {}", config.storage.attachments_path);

    let accounts = Arc::new(SledAccountStore::open(&config.storage.accounts_path)?);
    let files = Arc::new(RocksAttachmentStore::open(&config.storage.attachments_path)?);

    let publisher: Arc<dyn EventPublisher> = match &config.notifier.webhook_url {
        Some(url) => {
            info!("Lifecycle events go to {}", url);
            Arc::new(WebhookPublisher::new(url.clone()))
        }
        None => {
            info!("No webhook configured, lifecycle events are logged");
            Arc::new(LogPublisher)
        }
    };

    let state = AppState::new(accounts, files, publisher, &config);
    ApiServer::new(state, &config).start().await?;
    Ok(())
}
