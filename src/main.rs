//! CLI for lanchat
//!
//! Starts the relay: loads configuration, prepares the upload directory,
//! runs the hub and the WebSocket server until SIGINT/SIGTERM, then closes
//! every connection and removes the upload directory.

use clap::Parser;
use lanchat::config::{Settings, load_config};
use lanchat::hub::Hub;
use lanchat::transport::{bind, start_websocket_server};
use lanchat::upload::UploadStore;
use lanchat::utils::error::Result;
use lanchat::utils::logging;
use lanchat::utils::shutdown::Shutdown;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "lanchat", version, about = "LAN chat relay")]
struct Cli {
    /// IP address and port to listen on, e.g. `:8080` or `192.168.1.5:9000`
    #[arg(long)]
    addr: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init(cli.log_level.as_deref().unwrap_or(&settings.logging.level));

    if let Err(e) = run_server(cli, settings).await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run_server(cli: Cli, mut settings: Settings) -> Result<()> {
    if let Some(addr) = cli.addr.as_deref() {
        settings.server.apply_addr(addr)?;
    }

    // the directory is filled by an external upload layer through `UploadBridge`
    let store = UploadStore::open(&settings.uploads).await?;
    let listener = bind(&settings.server.addr()).await?;
    let shutdown = Shutdown::new();

    let (hub, handle) = Hub::new(&settings.hub);
    let hub_task = tokio::spawn(hub.run(shutdown.clone()));

    info!("Server started on {} ...", settings.server.addr());

    tokio::select! {
        res = start_websocket_server(listener, handle, settings.clone(), shutdown.clone()) => {
            if let Err(e) = res {
                error!("WebSocket server exited unexpectedly: {e}");
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    shutdown.trigger();
    if let Err(e) = hub_task.await {
        error!("Hub task failed: {e}");
    }
    store.remove_all().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
