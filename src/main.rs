//! Carbon Market API server.
//!
//! ```text
//!   client ──▶ POST /transaction/build ──▶ TransactionBuilder ──▶ ledger: GET /accounts/{id}
//!          ◀── unsigned envelope + passphrase
//!
//!   wallet signs (extension / popup / local key)
//!
//!   client ──▶ POST /transaction/submit ──▶ Submitter ──▶ ledger: POST /transactions
//!          ◀── transaction hash + explorer URL
//! ```

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use carbon_market::config::loader::load_from_env;
use carbon_market::config::watcher::ConfigWatcher;
use carbon_market::http::HttpServer;
use carbon_market::lifecycle::signals::spawn_signal_handler;
use carbon_market::lifecycle::Shutdown;
use carbon_market::net::tls::load_tls_config;
use carbon_market::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, config_path) = load_from_env()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "carbon-market starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        ledger_timeout_secs = config.ledger.timeout_secs,
        config_path = ?config_path,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher handle alive for the life of the server.
    let (config_updates, _watcher) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            let addr = bind_address.parse()?;
            server
                .run_tls(addr, rustls, config_updates, shutdown.subscribe())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, config_updates, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
