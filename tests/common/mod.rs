//! Shared utilities for integration tests: a mock ledger API and an
//! in-process service bound to ephemeral ports.

#![allow(dead_code)]

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use carbon_market::config::MarketConfig;
use carbon_market::http::HttpServer;
use carbon_market::lifecycle::Shutdown;

pub const SECRET: &str = "SADQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQP54X";
pub const PUBLIC: &str = "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57";

/// Programmable stand-in for the ledger's HTTP API.
#[derive(Clone, Default)]
pub struct MockLedger {
    inner: Arc<MockLedgerState>,
}

#[derive(Default)]
struct MockLedgerState {
    accounts: Mutex<HashMap<String, Value>>,
    submit_response: Mutex<Option<(u16, Value)>>,
    submitted: Mutex<Vec<String>>,
    account_lookups: Mutex<usize>,
    account_failure: Mutex<Option<u16>>,
}

impl MockLedger {
    /// Register a funded account with `sequence` and a USDC balance.
    pub fn add_account(&self, public_key: &str, sequence: i64, usdc_issuer: &str, usdc: &str) {
        let body = json!({
            "id": public_key,
            "account_id": public_key,
            "sequence": sequence.to_string(),
            "balances": [
                {
                    "balance": usdc,
                    "asset_type": "credit_alphanum4",
                    "asset_code": "USDC",
                    "asset_issuer": usdc_issuer
                },
                { "balance": "9999.9999900", "asset_type": "native" }
            ]
        });
        self.inner.accounts.lock().unwrap().insert(public_key.to_string(), body);
    }

    /// Register an account with an explicit Horizon balance list.
    pub fn add_account_with_balances(&self, public_key: &str, sequence: i64, balances: Value) {
        let body = json!({
            "id": public_key,
            "account_id": public_key,
            "sequence": sequence.to_string(),
            "balances": balances
        });
        self.inner.accounts.lock().unwrap().insert(public_key.to_string(), body);
    }

    /// Answer every account lookup with `status` and a problem document.
    pub fn fail_account_lookups(&self, status: u16) {
        *self.inner.account_failure.lock().unwrap() = Some(status);
    }

    pub fn respond_to_submit(&self, status: u16, body: Value) {
        *self.inner.submit_response.lock().unwrap() = Some((status, body));
    }

    pub fn submitted(&self) -> Vec<String> {
        self.inner.submitted.lock().unwrap().clone()
    }

    pub fn account_lookups(&self) -> usize {
        *self.inner.account_lookups.lock().unwrap()
    }

    /// Serve on an ephemeral port; returns the base URL.
    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/", get(|| async { Json(json!({ "horizon_version": "mock" })) }))
            .route("/accounts/{id}", get(account))
            .route("/transactions", post(transactions))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}", addr)
    }
}

async fn account(State(mock): State<MockLedger>, Path(id): Path<String>) -> impl IntoResponse {
    *mock.inner.account_lookups.lock().unwrap() += 1;
    if let Some(status) = *mock.inner.account_failure.lock().unwrap() {
        return (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({ "title": "Internal Server Error", "detail": "database unavailable" })),
        );
    }
    match mock.inner.accounts.lock().unwrap().get(&id) {
        Some(body) => (StatusCode::OK, Json(body.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "title": "Resource Missing", "status": 404 })),
        ),
    }
}

async fn transactions(
    State(mock): State<MockLedger>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    if let Some(tx) = form.get("tx") {
        mock.inner.submitted.lock().unwrap().push(tx.clone());
    }
    let (status, body) = mock
        .inner
        .submit_response
        .lock()
        .unwrap()
        .clone()
        .unwrap_or((200, json!({ "hash": "deadbeef" })));
    (StatusCode::from_u16(status).unwrap(), Json(body))
}

/// Running service under test.
pub struct TestService {
    pub base_url: String,
    pub shutdown: Shutdown,
    _config_tx: mpsc::UnboundedSender<MarketConfig>,
}

impl Drop for TestService {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the service with both networks pointed at `ledger_url`.
pub async fn start_service(ledger_url: &str) -> TestService {
    let mut config = MarketConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.ledger.testnet_url = Some(ledger_url.to_string());
    config.ledger.mainnet_url = Some(ledger_url.to_string());
    config.ledger.timeout_secs = 5;
    config.observability.metrics_enabled = false;

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestService {
        base_url: format!("http://{}", addr),
        shutdown,
        _config_tx: config_tx,
    }
}
