//! Horizon HTTP client with timeouts and error classification.
//!
//! # Responsibilities
//! - Load account state (sequence number) for transaction building
//! - Fetch wallet balances, treating unfunded accounts as empty
//! - Submit signed envelopes and classify the ledger's answer
//! - Provide a health probe per network

use async_trait::async_trait;
use reqwest::StatusCode;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::config::schema::LedgerConfig;
use crate::ledger::types::{
    AccountState, Balances, HorizonAccount, HorizonProblem, HorizonSubmitted, LedgerError,
    LedgerResult,
};
use crate::network::{resolve_network, NetworkSelector};
use crate::observability::metrics;

/// Source of on-ledger account state.
#[async_trait]
pub trait AccountLoader: Send + Sync {
    async fn load_account(
        &self,
        public_key: &str,
        network: NetworkSelector,
    ) -> LedgerResult<AccountState>;
}

/// Source of wallet balances.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balances(&self, public_key: &str, network: NetworkSelector) -> LedgerResult<Balances>;
}

/// Client for the ledger's public HTTP API.
#[derive(Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    config: LedgerConfig,
    timeout_duration: Duration,
}

impl LedgerClient {
    /// Create a new client from configuration.
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        let timeout_duration = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout_duration)
            .user_agent(concat!("carbon-market/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            timeout_duration,
        })
    }

    /// Horizon base URL for `network`, honoring configured overrides.
    pub fn base_url(&self, network: NetworkSelector) -> String {
        let override_url = match network {
            NetworkSelector::Testnet => self.config.testnet_url.as_deref(),
            NetworkSelector::Mainnet => self.config.mainnet_url.as_deref(),
        };
        override_url
            .unwrap_or(resolve_network(network).endpoint_base_url)
            .trim_end_matches('/')
            .to_string()
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn get_account(
        &self,
        public_key: &str,
        network: NetworkSelector,
    ) -> LedgerResult<Option<HorizonAccount>> {
        stellar_strkey::ed25519::PublicKey::from_string(public_key)
            .map_err(|_| LedgerError::InvalidAccountId(public_key.to_string()))?;

        let url = format!("{}/accounts/{}", self.base_url(network), public_key);
        let response = self
            .deadline(self.http.get(&url).send())
            .await?
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }

        response
            .json::<HorizonAccount>()
            .await
            .map(Some)
            .map_err(|e| LedgerError::Decode(e.to_string()))
    }

    /// Fetch the stablecoin and native balances of `public_key`.
    ///
    /// An account that does not exist yet has zero balances.
    pub async fn fetch_balances(
        &self,
        public_key: &str,
        network: NetworkSelector,
    ) -> LedgerResult<Balances> {
        let start = Instant::now();
        let result = self.get_account(public_key, network).await;
        metrics::record_ledger_call("fetch_balances", outcome(&result), start);

        let account = match result? {
            Some(account) => account,
            None => {
                tracing::debug!(public_key = %public_key, network = %network, "Account unfunded, reporting zero balances");
                return Ok(Balances::zero());
            }
        };

        let stablecoin = resolve_network(network).stablecoin_asset;
        let mut balances = Balances::zero();
        for entry in account.balances {
            if entry.asset_type == "native" {
                balances.native_balance = entry.balance;
            } else if entry.asset_code.as_deref() == Some(stablecoin.code)
                && entry.asset_issuer.as_deref() == Some(stablecoin.issuer_address)
            {
                balances.stablecoin_balance = entry.balance;
            }
        }
        Ok(balances)
    }

    /// Submit a base64 XDR envelope. Returns the transaction hash.
    pub async fn submit_transaction(
        &self,
        envelope_xdr: &str,
        network: NetworkSelector,
    ) -> LedgerResult<String> {
        let start = Instant::now();
        let result = self.post_transaction(envelope_xdr, network).await;
        metrics::record_ledger_call("submit_transaction", outcome(&result), start);
        result
    }

    async fn post_transaction(
        &self,
        envelope_xdr: &str,
        network: NetworkSelector,
    ) -> LedgerResult<String> {
        let url = format!("{}/transactions", self.base_url(network));
        let response = self
            .deadline(self.http.post(&url).form(&[("tx", envelope_xdr)]).send())
            .await?
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body));
        }

        serde_json::from_str::<HorizonSubmitted>(&body)
            .map(|submitted| submitted.hash)
            .map_err(|e| LedgerError::Decode(format!("missing transaction hash: {}", e)))
    }

    /// Check whether the ledger endpoint for `network` answers.
    pub async fn is_healthy(&self, network: NetworkSelector) -> bool {
        let url = format!("{}/", self.base_url(network));
        let healthy = match self.deadline(self.http.get(&url).send()).await {
            Ok(Ok(response)) => response.status().is_success(),
            _ => false,
        };
        metrics::record_ledger_health(network.as_str(), healthy);
        healthy
    }

    async fn deadline<F, T>(&self, fut: F) -> LedgerResult<T>
    where
        F: Future<Output = T>,
    {
        timeout(self.timeout_duration, fut)
            .await
            .map_err(|_| LedgerError::Timeout(self.config.timeout_secs))
    }
}

#[async_trait]
impl AccountLoader for LedgerClient {
    async fn load_account(
        &self,
        public_key: &str,
        network: NetworkSelector,
    ) -> LedgerResult<AccountState> {
        let start = Instant::now();
        let result = self.get_account(public_key, network).await;
        metrics::record_ledger_call("load_account", outcome(&result), start);

        let account = result?.ok_or_else(|| LedgerError::AccountNotFound(public_key.to_string()))?;
        let sequence = account
            .sequence
            .parse::<i64>()
            .map_err(|e| LedgerError::Decode(format!("bad sequence '{}': {}", account.sequence, e)))?;

        Ok(AccountState {
            account_id: account.account_id,
            sequence,
        })
    }
}

#[async_trait]
impl BalanceSource for LedgerClient {
    async fn balances(&self, public_key: &str, network: NetworkSelector) -> LedgerResult<Balances> {
        self.fetch_balances(public_key, network).await
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("testnet_url", &self.base_url(NetworkSelector::Testnet))
            .field("mainnet_url", &self.base_url(NetworkSelector::Mainnet))
            .field("timeout_secs", &self.config.timeout_secs)
            .finish()
    }
}

/// Turn a failed Horizon response into a `LedgerError`.
///
/// A transaction result code, when present, wins over everything else so
/// the ledger's own diagnosis reaches the caller unchanged.
pub fn classify_failure(status: u16, body: &str) -> LedgerError {
    let problem: HorizonProblem = serde_json::from_str(body).unwrap_or_default();

    if let Some(codes) = problem.extras.and_then(|extras| extras.result_codes) {
        if let Some(code) = codes.transaction {
            return LedgerError::Rejected {
                code,
                operations: codes.operations,
            };
        }
    }

    let message = problem
        .detail
        .or(problem.title)
        .unwrap_or_else(|| body.chars().take(200).collect());
    LedgerError::Http { status, message }
}

fn outcome<T>(result: &LedgerResult<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(LedgerError::AccountNotFound(_)) => "not_found",
        Err(LedgerError::Rejected { .. }) => "rejected",
        Err(LedgerError::InvalidAccountId(_)) => "invalid",
        Err(LedgerError::Timeout(_)) => "timeout",
        Err(_) => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_account_id_never_reaches_ledger() {
        // Nothing listens here; a request would surface as a transport error.
        let client = LedgerClient::new(LedgerConfig {
            testnet_url: Some("http://127.0.0.1:9".to_string()),
            ..LedgerConfig::default()
        })
        .unwrap();

        for bad in ["../transactions", "GABC?x=1", ""] {
            let err = client.fetch_balances(bad, NetworkSelector::Testnet).await.unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAccountId(ref id) if id == bad));
        }
    }

    #[test]
    fn test_structured_rejection_preserved() {
        let body = r#"{"extras":{"result_codes":{"transaction":"tx_bad_seq"}}}"#;
        match classify_failure(400, body) {
            LedgerError::Rejected { code, operations } => {
                assert_eq!(code, "tx_bad_seq");
                assert!(operations.is_empty());
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_operation_codes_kept() {
        let body = r#"{"title":"Transaction Failed","extras":{"result_codes":
            {"transaction":"tx_failed","operations":["op_underfunded","op_success"]}}}"#;
        match classify_failure(400, body) {
            LedgerError::Rejected { code, operations } => {
                assert_eq!(code, "tx_failed");
                assert_eq!(operations, vec!["op_underfunded", "op_success"]);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_unstructured_failure_is_http_error() {
        match classify_failure(503, "upstream down") {
            LedgerError::Http { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected http error, got {other:?}"),
        }

        let body = r#"{"title":"Rate Limit Exceeded","detail":"slow down"}"#;
        assert!(matches!(
            classify_failure(429, body),
            LedgerError::Http { status: 429, ref message } if message == "slow down"
        ));
    }

    #[test]
    fn test_base_url_overrides() {
        let config = LedgerConfig {
            testnet_url: Some("http://127.0.0.1:9000/".to_string()),
            ..LedgerConfig::default()
        };
        let client = LedgerClient::new(config).unwrap();
        assert_eq!(client.base_url(NetworkSelector::Testnet), "http://127.0.0.1:9000");
        assert_eq!(client.base_url(NetworkSelector::Mainnet), "https://horizon.stellar.org");
    }
}
