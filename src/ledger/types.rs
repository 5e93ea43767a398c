//! Ledger-facing types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::amount::Amount;

/// Errors from talking to the ledger's HTTP API.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The account does not exist on-ledger (never funded).
    #[error("account {0} not found on ledger")]
    AccountNotFound(String),

    /// The account id is not a valid ed25519 public key.
    #[error("invalid account id '{0}'")]
    InvalidAccountId(String),

    /// The ledger rejected a transaction with a structured result code.
    #[error("transaction rejected by ledger: {code}")]
    Rejected {
        /// Transaction-level result code, verbatim (e.g. `tx_bad_seq`).
        code: String,
        /// Per-operation result codes, when reported.
        operations: Vec<String>,
    },

    /// Non-success HTTP status without a structured result code.
    #[error("ledger returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection failure before any HTTP status was received.
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// Request exceeded the configured ledger timeout.
    #[error("ledger request timed out after {0} seconds")]
    Timeout(u64),

    /// The ledger answered with a body we could not interpret.
    #[error("unexpected ledger response: {0}")]
    Decode(String),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// On-ledger state of an account needed to build a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub account_id: String,
    /// Last consumed sequence number; the next transaction uses `sequence + 1`.
    pub sequence: i64,
}

/// Balances shown for a connected wallet.
///
/// Values are the ledger's own decimal strings, never reparsed through
/// floating point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub stablecoin_balance: String,
    pub native_balance: String,
}

impl Balances {
    /// Balances of an account that does not exist yet.
    pub fn zero() -> Self {
        Self {
            stablecoin_balance: Amount::ZERO.to_string(),
            native_balance: Amount::ZERO.to_string(),
        }
    }
}

impl Default for Balances {
    fn default() -> Self {
        Self::zero()
    }
}

/// `GET /accounts/{id}` response (fields we use).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HorizonAccount {
    pub account_id: String,
    pub sequence: String,
    #[serde(default)]
    pub balances: Vec<HorizonBalance>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HorizonBalance {
    pub balance: String,
    pub asset_type: String,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
}

/// Successful `POST /transactions` response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HorizonSubmitted {
    pub hash: String,
}

/// Problem document returned on failed requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HorizonProblem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub extras: Option<HorizonExtras>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HorizonExtras {
    #[serde(default)]
    pub result_codes: Option<HorizonResultCodes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct HorizonResultCodes {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub operations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_balances_keep_precision() {
        let zero = Balances::zero();
        assert_eq!(zero.stablecoin_balance, "0.0000000");
        assert_eq!(zero.native_balance, "0.0000000");
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Rejected {
            code: "tx_bad_seq".to_string(),
            operations: Vec::new(),
        };
        assert_eq!(err.to_string(), "transaction rejected by ledger: tx_bad_seq");

        let err = LedgerError::Timeout(10);
        assert_eq!(err.to_string(), "ledger request timed out after 10 seconds");
    }

    #[test]
    fn test_account_decoding() {
        let body = r#"{
            "id": "GABC",
            "account_id": "GABC",
            "sequence": "4294967296",
            "balances": [
                {"balance": "12.5000000", "asset_type": "credit_alphanum4",
                 "asset_code": "USDC", "asset_issuer": "GISSUER"},
                {"balance": "9999.9999900", "asset_type": "native"}
            ]
        }"#;
        let account: HorizonAccount = serde_json::from_str(body).unwrap();
        assert_eq!(account.account_id, "GABC");
        assert_eq!(account.sequence, "4294967296");
        assert_eq!(account.balances.len(), 2);
        assert_eq!(account.balances[0].asset_code.as_deref(), Some("USDC"));
    }
}
