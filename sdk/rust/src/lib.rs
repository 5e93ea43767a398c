//! Typed client for the carbon market transaction API.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an error body.
    #[error("API error {status} ({error}): {message}")]
    Api {
        status: u16,
        /// Stable error code, or the ledger's result code on rejected submits.
        error: String,
        message: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Purchase selection. Amounts are decimal strings with up to 7 fractional digits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub project_id: String,
    pub quantity: String,
    pub calculated_price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTransactionRequest {
    pub selection: Selection,
    pub wallet_public_key: String,
    /// `testnet` or `mainnet`.
    pub network: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub transaction_xdr: String,
    pub network_passphrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitTransactionRequest<'a> {
    signed_transaction_envelope: &'a str,
    network: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTransaction {
    pub transaction_hash: String,
    pub explorer_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: String,
}

pub struct MarketClient {
    client: Client,
    base_url: String,
}

impl MarketClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build an unsigned purchase transaction.
    pub async fn build_transaction(
        &self,
        request: &BuildTransactionRequest,
    ) -> Result<UnsignedTransaction, SdkError> {
        let resp = self
            .client
            .post(format!("{}/transaction/build", self.base_url))
            .json(request)
            .send()
            .await?;
        decode(resp).await
    }

    /// Submit a signed envelope (base64 XDR).
    pub async fn submit_transaction(
        &self,
        signed_xdr: &str,
        network: &str,
    ) -> Result<SubmittedTransaction, SdkError> {
        let resp = self
            .client
            .post(format!("{}/transaction/submit", self.base_url))
            .json(&SubmitTransactionRequest {
                signed_transaction_envelope: signed_xdr,
                network,
            })
            .send()
            .await?;
        decode(resp).await
    }

    /// Public profile of a network (endpoint, passphrase, assets).
    pub async fn network_profile(&self, network: &str) -> Result<serde_json::Value, SdkError> {
        let resp = self
            .client
            .get(format!("{}/networks/{}", self.base_url, network))
            .send()
            .await?;
        decode(resp).await
    }

    /// Service health, including ledger reachability.
    pub async fn health(&self) -> Result<serde_json::Value, SdkError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, SdkError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => SdkError::Api {
                status: status.as_u16(),
                error: body.error,
                message: body.message,
            },
            Err(_) => SdkError::Api {
                status: status.as_u16(),
                error: "http_error".to_string(),
                message: text,
            },
        });
    }

    Ok(serde_json::from_str(&text)?)
}
