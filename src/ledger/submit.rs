//! Submission of signed envelopes and confirmation handling.

use std::time::Instant;
use thiserror::Error;

use crate::ledger::client::LedgerClient;
use crate::ledger::envelope::{EnvelopeError, SignedEnvelope, TransactionConfirmation};
use crate::ledger::types::LedgerError;
use crate::network::resolver::EXPLORER_BASE_URL;
use crate::network::{resolve_network, NetworkSelector};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidEnvelope(#[from] EnvelopeError),

    #[error("envelope carries no signatures")]
    Unsigned,

    /// Envelope was signed for a different network than requested.
    #[error("envelope passphrase does not match network {network}")]
    NetworkMismatch { network: NetworkSelector },

    /// The ledger refused the transaction; `code` is its result code verbatim.
    #[error("submission rejected: {code}")]
    Rejected { code: String, operations: Vec<String> },

    #[error(transparent)]
    Network(LedgerError),
}

impl SubmitError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SubmitError::InvalidEnvelope(_) | SubmitError::Unsigned | SubmitError::NetworkMismatch { .. }
        )
    }
}

impl From<LedgerError> for SubmitError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected { code, operations } => SubmitError::Rejected { code, operations },
            other => SubmitError::Network(other),
        }
    }
}

/// Posts signed envelopes to the ledger.
#[derive(Debug, Clone)]
pub struct Submitter {
    client: LedgerClient,
}

impl Submitter {
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    /// Submit `signed` to `network`. The envelope is consumed: a retry must
    /// rebuild, since its sequence number can be used only once.
    pub async fn submit(
        &self,
        signed: SignedEnvelope,
        network: NetworkSelector,
    ) -> Result<TransactionConfirmation, SubmitError> {
        let start = Instant::now();

        if signed.network_passphrase != resolve_network(network).protocol_passphrase {
            return Err(SubmitError::NetworkMismatch { network });
        }
        if signed.signature_count()? == 0 {
            return Err(SubmitError::Unsigned);
        }

        let result = self
            .client
            .submit_transaction(&signed.transaction_xdr, network)
            .await
            .map_err(SubmitError::from);

        match &result {
            Ok(hash) => {
                metrics::record_submission("accepted", start);
                tracing::info!(tx_hash = %hash, network = %network, "Transaction settled");
            }
            Err(SubmitError::Rejected { code, operations }) => {
                metrics::record_submission(code, start);
                tracing::warn!(result_code = %code, operations = ?operations, network = %network, "Ledger rejected transaction");
            }
            Err(e) => {
                metrics::record_submission("network_error", start);
                tracing::error!(error = %e, network = %network, "Transaction submission failed");
            }
        }

        result.map(|transaction_hash| TransactionConfirmation { transaction_hash })
    }
}

/// Block-explorer page for a settled transaction.
pub fn explorer_url(transaction_hash: &str, network: NetworkSelector) -> String {
    format!(
        "{}/{}/tx/{}",
        EXPLORER_BASE_URL,
        resolve_network(network).explorer_segment,
        transaction_hash
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LedgerConfig;
    use crate::network::resolver::{MAINNET_PASSPHRASE, TESTNET_PASSPHRASE};

    fn submitter() -> Submitter {
        let config = LedgerConfig {
            testnet_url: Some("http://127.0.0.1:9".to_string()),
            ..LedgerConfig::default()
        };
        Submitter::new(LedgerClient::new(config).unwrap())
    }

    #[test]
    fn test_explorer_urls() {
        assert_eq!(
            explorer_url("deadbeef", NetworkSelector::Testnet),
            "https://stellar.expert/explorer/testnet/tx/deadbeef"
        );
        assert_eq!(
            explorer_url("deadbeef", NetworkSelector::Mainnet),
            "https://stellar.expert/explorer/public/tx/deadbeef"
        );
    }

    #[test]
    fn test_rejection_mapping() {
        let err = SubmitError::from(LedgerError::Rejected {
            code: "tx_bad_seq".to_string(),
            operations: vec![],
        });
        assert!(matches!(err, SubmitError::Rejected { ref code, .. } if code == "tx_bad_seq"));

        let err = SubmitError::from(LedgerError::Timeout(5));
        assert!(matches!(err, SubmitError::Network(LedgerError::Timeout(5))));
    }

    #[tokio::test]
    async fn test_wrong_network_rejected_locally() {
        let signed = SignedEnvelope {
            transaction_xdr: "AAAA".to_string(),
            network_passphrase: MAINNET_PASSPHRASE.to_string(),
        };
        let err = submitter().submit(signed, NetworkSelector::Testnet).await.unwrap_err();
        assert!(matches!(err, SubmitError::NetworkMismatch { network: NetworkSelector::Testnet }));
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_garbage_envelope_rejected_locally() {
        let signed = SignedEnvelope {
            transaction_xdr: "%%%".to_string(),
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
        };
        let err = submitter().submit(signed, NetworkSelector::Testnet).await.unwrap_err();
        assert!(matches!(err, SubmitError::InvalidEnvelope(_)));
    }
}
