//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (timeout, body limit, request ID, tracing, security headers)
//! - Hold per-config state behind an `ArcSwap` so reloads apply without restart
//! - Serve on plain TCP or TLS until shutdown

use arc_swap::ArcSwap;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::MarketConfig;
use crate::http::handlers;
use crate::ledger::types::LedgerError;
use crate::ledger::{LedgerClient, Submitter, TransactionBuilder};
use crate::lifecycle::Shutdown;

/// Everything derived from one configuration.
pub struct InnerState {
    pub config: MarketConfig,
    pub ledger: LedgerClient,
    pub builder: TransactionBuilder<LedgerClient>,
    pub submitter: Submitter,
}

impl InnerState {
    pub fn from_config(config: MarketConfig) -> Result<Self, LedgerError> {
        let ledger = LedgerClient::new(config.ledger.clone())?;
        let builder = TransactionBuilder::new(ledger.clone(), &config.transactions);
        let submitter = Submitter::new(ledger.clone());
        Ok(Self {
            config,
            ledger,
            builder,
            submitter,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
}

impl AppState {
    pub fn new(inner: InnerState) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(inner)),
        }
    }

    /// Rebuild state from `config` and swap it in. Keeps the old state on error.
    pub fn apply(&self, config: MarketConfig) -> Result<(), LedgerError> {
        let next = InnerState::from_config(config)?;
        self.inner.store(Arc::new(next));
        Ok(())
    }
}

/// HTTP server for the marketplace API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: MarketConfig) -> Result<Self, LedgerError> {
        let router_config = config.clone();
        let state = AppState::new(InnerState::from_config(config)?);
        let router = Self::build_router(&router_config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Timeout, body limit and headers are fixed at startup; reloads change
    /// only the ledger, transaction and wallet settings.
    #[allow(deprecated)]
    fn build_router(config: &MarketConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/transaction/build", post(handlers::build_transaction))
            .route("/transaction/submit", post(handlers::submit_transaction))
            .route("/health", get(handlers::health))
            .route("/networks/{network}", get(handlers::network_profile))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        let router = if config.security.enable_headers {
            router
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("no-referrer"),
                ))
        } else {
            router
        };

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Shared state, for swapping in reloaded configs.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Router with state attached; used by in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<MarketConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_reloader(self.state.clone(), config_updates);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(Shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: std::net::SocketAddr,
        tls: axum_server::tls_rustls::RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<MarketConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        spawn_reloader(self.state.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            Shutdown::wait(shutdown).await;
            drain.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

fn spawn_reloader(state: AppState, mut config_updates: mpsc::UnboundedReceiver<MarketConfig>) {
    tokio::spawn(async move {
        while let Some(config) = config_updates.recv().await {
            match state.apply(config) {
                Ok(()) => tracing::info!("Configuration reloaded"),
                Err(e) => tracing::error!(error = %e, "Reloaded configuration rejected, keeping current"),
            }
        }
    });
}
