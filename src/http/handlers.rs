//! Endpoint handlers.
//!
//! - `POST /transaction/build`  → unsigned envelope + passphrase
//! - `POST /transaction/submit` → transaction hash + explorer URL
//! - `GET  /health`             → ledger reachability per network
//! - `GET  /networks/{network}` → public network profile

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::http::request::RequestId;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::ledger::builder::{BuildRequest, CreditSelection};
use crate::ledger::envelope::{SignedEnvelope, UnsignedEnvelope};
use crate::ledger::explorer_url;
use crate::network::{resolve_network, NetworkProfile, NetworkSelector};
use crate::observability::metrics;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTransactionBody {
    #[serde(default)]
    pub selection: CreditSelection,
    #[serde(default)]
    pub wallet_public_key: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionBody {
    /// Base64 XDR of the signed envelope.
    #[serde(default)]
    pub signed_transaction_envelope: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTransactionResponse {
    pub transaction_hash: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkHealth {
    pub testnet: bool,
    pub mainnet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ledger: NetworkHealth,
}

/// Absent or blank means "not given"; anything else must name a network.
fn parse_network(raw: Option<&str>) -> Result<Option<NetworkSelector>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => Ok(Some(name.parse()?)),
        None => Ok(None),
    }
}

pub async fn build_transaction(
    State(state): State<AppState>,
    request_id: RequestId,
    body: Result<Json<BuildTransactionBody>, JsonRejection>,
) -> Result<Json<UnsignedEnvelope>, ApiError> {
    let start = Instant::now();
    let result = build_inner(&state, &request_id, body).await;
    let status = result.as_ref().map(|_| 200).unwrap_or_else(|e| e.status.as_u16());
    metrics::record_request("build", status, start);
    result.map(Json)
}

async fn build_inner(
    state: &AppState,
    request_id: &RequestId,
    body: Result<Json<BuildTransactionBody>, JsonRejection>,
) -> Result<UnsignedEnvelope, ApiError> {
    let Json(body) = body?;
    let request = BuildRequest {
        selection: body.selection,
        wallet_public_key: body.wallet_public_key,
        network: parse_network(body.network.as_deref())?,
        idempotency_key: body.idempotency_key,
    };

    let inner = state.inner.load_full();
    match inner.builder.build(&request).await {
        Ok(envelope) => {
            tracing::info!(
                request_id = %request_id,
                project_id = request.selection.project_id.as_deref().unwrap_or_default(),
                idempotency_key = request.idempotency_key.as_deref().unwrap_or_default(),
                "Purchase transaction built"
            );
            Ok(envelope)
        }
        Err(e) => {
            if e.is_validation() {
                tracing::debug!(request_id = %request_id, error = %e, "Build request rejected");
            } else {
                tracing::error!(request_id = %request_id, error = %e, "Transaction build failed");
            }
            Err(e.into())
        }
    }
}

pub async fn submit_transaction(
    State(state): State<AppState>,
    request_id: RequestId,
    body: Result<Json<SubmitTransactionBody>, JsonRejection>,
) -> Result<Json<SubmitTransactionResponse>, ApiError> {
    let start = Instant::now();
    let result = submit_inner(&state, &request_id, body).await;
    let status = result.as_ref().map(|_| 200).unwrap_or_else(|e| e.status.as_u16());
    metrics::record_request("submit", status, start);
    result.map(Json)
}

async fn submit_inner(
    state: &AppState,
    request_id: &RequestId,
    body: Result<Json<SubmitTransactionBody>, JsonRejection>,
) -> Result<SubmitTransactionResponse, ApiError> {
    let Json(body) = body?;
    let network = parse_network(body.network.as_deref())?;
    let xdr = body
        .signed_transaction_envelope
        .filter(|x| !x.trim().is_empty());

    let (xdr, network) = match (xdr, network) {
        (Some(xdr), Some(network)) => (xdr, network),
        (xdr, network) => {
            let mut missing = Vec::new();
            if xdr.is_none() {
                missing.push("signedTransactionEnvelope");
            }
            if network.is_none() {
                missing.push("network");
            }
            return Err(ApiError::bad_request(
                "missing_parameters",
                format!("missing parameters: {}", missing.join(", ")),
            ));
        }
    };

    let signed = SignedEnvelope {
        transaction_xdr: xdr,
        network_passphrase: resolve_network(network).protocol_passphrase.to_string(),
    };

    let inner = state.inner.load_full();
    match inner.submitter.submit(signed, network).await {
        Ok(confirmation) => {
            tracing::info!(
                request_id = %request_id,
                tx_hash = %confirmation.transaction_hash,
                network = %network,
                "Transaction submitted"
            );
            Ok(SubmitTransactionResponse {
                explorer_url: explorer_url(&confirmation.transaction_hash, network),
                transaction_hash: confirmation.transaction_hash,
            })
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Submission failed");
            Err(e.into())
        }
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let inner = state.inner.load_full();
    let (testnet, mainnet) = tokio::join!(
        inner.ledger.is_healthy(NetworkSelector::Testnet),
        inner.ledger.is_healthy(NetworkSelector::Mainnet),
    );

    let (status, label) = if testnet || mainnet {
        (StatusCode::OK, if testnet && mainnet { "ok" } else { "degraded" })
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    metrics::record_request("health", status.as_u16(), start);

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            ledger: NetworkHealth { testnet, mainnet },
        }),
    )
}

pub async fn network_profile(Path(network): Path<String>) -> Result<Json<NetworkProfile>, ApiError> {
    let start = Instant::now();
    let result = network
        .parse::<NetworkSelector>()
        .map(resolve_network)
        .map_err(ApiError::from);
    let status = result.as_ref().map(|_| 200).unwrap_or_else(|e| e.status.as_u16());
    metrics::record_request("network_profile", status, start);
    result.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_network() {
        assert_eq!(parse_network(None).unwrap(), None);
        assert_eq!(parse_network(Some("  ")).unwrap(), None);
        assert_eq!(parse_network(Some("testnet")).unwrap(), Some(NetworkSelector::Testnet));
        assert_eq!(parse_network(Some("production")).unwrap(), Some(NetworkSelector::Mainnet));
        assert_eq!(parse_network(Some("moonnet")).unwrap_err().code, "invalid_network");
    }

    #[test]
    fn test_build_body_accepts_numbers() {
        let body: BuildTransactionBody = serde_json::from_str(
            r#"{"selection":{"projectId":"proj-1","quantity":10,"calculatedPrice":105.0},
                "walletPublicKey":"GABC","network":"testnet","idempotencyKey":"abc-123"}"#,
        )
        .unwrap();
        assert_eq!(body.selection.quantity.unwrap().to_string(), "10.0000000");
        assert_eq!(body.selection.calculated_price.unwrap().to_string(), "105.0000000");
    }
}
