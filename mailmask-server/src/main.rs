// mailmask-server/src/main.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use mailmask_core::{
    AddressGenerator, Config, ForwardingEngine, HttpRelay, LogTransport, MailTransport,
    MaskingService, Sweeper,
};
use mailmask_server::api;
use mask_store::{MappingStore, SqliteStore};

#[derive(Parser)]
#[command(name = "maskd")]
#[command(about = "Disposable email forwarding service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service
    Run {
        /// Configuration file
        #[arg(short, long, default_value = "mailmask.toml")]
        config: PathBuf,
    },
    /// Validate the configuration file and exit
    CheckConfig {
        /// Configuration file
        #[arg(short, long, default_value = "mailmask.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(&config).await,
        Commands::CheckConfig { config } => check_config(&config),
    }
}

async fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    config.validate()?;

    let store: Arc<dyn MappingStore> = Arc::new(SqliteStore::open(&config.database_path).await?);

    let transport: Arc<dyn MailTransport> = match &config.relay.endpoint {
        Some(endpoint) => {
            let relay = HttpRelay::new(endpoint.clone(), config.relay_timeout())
                .map_err(|e| anyhow::anyhow!("building relay client: {e}"))?;
            match &config.relay.bearer_token {
                Some(token) => Arc::new(relay.with_token(token.clone())),
                None => Arc::new(relay),
            }
        }
        None => {
            tracing::warn!("no relay endpoint configured; inbound mail will be logged, not delivered");
            Arc::new(LogTransport)
        }
    };

    let service = Arc::new(MaskingService::new(
        Arc::clone(&store),
        Arc::new(AddressGenerator::new(config.mask_domain.clone())),
    ));
    let engine = Arc::new(ForwardingEngine::new(Arc::clone(&store), transport));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = Sweeper::new(Arc::clone(&store), config.sweep_interval());
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown_rx));

    let app = api::router(api::AppState { service, engine });
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        domain = %config.mask_domain,
        db = %config.database_path.display(),
        "maskd listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the sweeper after the listener drains.
    let _ = shutdown_tx.send(true);
    let _ = sweeper_handle.await;
    tracing::info!("maskd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}

fn check_config(path: &Path) -> Result<()> {
    let config = Config::load(path)?;
    config.validate()?;
    println!("configuration OK");
    println!("  bind_addr:   {}", config.bind_addr);
    println!("  mask_domain: {}", config.mask_domain);
    println!("  database:    {}", config.database_path.display());
    println!(
        "  relay:       {}",
        config.relay.endpoint.as_deref().unwrap_or("(log only)")
    );
    Ok(())
}
