//! Transaction envelopes exchanged between builder, signer and submitter.
//!
//! An envelope always travels with the passphrase it must be signed
//! against; a signature is only valid under that passphrase.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    Hash, Limits, ReadXdr, Transaction, TransactionEnvelope, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, WriteXdr,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("envelope is not valid base64 XDR: {0}")]
    Decode(String),
    #[error("failed to encode envelope: {0}")]
    Encode(String),
    #[error("only v1 transaction envelopes are supported")]
    UnsupportedKind,
}

/// Built, not yet signed. Produced once and handed straight to a signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedEnvelope {
    pub transaction_xdr: String,
    pub network_passphrase: String,
}

/// Signed envelope. Consumed by a single submission attempt.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedEnvelope {
    pub transaction_xdr: String,
    pub network_passphrase: String,
}

/// Proof of settlement returned after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionConfirmation {
    pub transaction_hash: String,
}

impl UnsignedEnvelope {
    /// Decode the inner XDR.
    pub fn decode(&self) -> Result<TransactionEnvelope, EnvelopeError> {
        decode_envelope(&self.transaction_xdr)
    }

    /// Hex transaction hash under this envelope's passphrase.
    pub fn hash_hex(&self) -> Result<String, EnvelopeError> {
        envelope_hash_hex(&self.decode()?, &self.network_passphrase)
    }
}

impl SignedEnvelope {
    pub fn decode(&self) -> Result<TransactionEnvelope, EnvelopeError> {
        decode_envelope(&self.transaction_xdr)
    }

    /// Number of signatures attached.
    pub fn signature_count(&self) -> Result<usize, EnvelopeError> {
        match self.decode()? {
            TransactionEnvelope::Tx(v1) => Ok(v1.signatures.len()),
            TransactionEnvelope::TxV0(v0) => Ok(v0.signatures.len()),
            TransactionEnvelope::TxFeeBump(fb) => Ok(fb.signatures.len()),
        }
    }
}

/// SHA-256 of the passphrase; the network id mixed into signatures.
pub fn network_id(passphrase: &str) -> Hash {
    Hash(Sha256::digest(passphrase.as_bytes()).into())
}

pub fn decode_envelope(xdr: &str) -> Result<TransactionEnvelope, EnvelopeError> {
    TransactionEnvelope::from_xdr_base64(xdr.trim(), Limits::none())
        .map_err(|e| EnvelopeError::Decode(e.to_string()))
}

pub fn encode_envelope(envelope: &TransactionEnvelope) -> Result<String, EnvelopeError> {
    envelope
        .to_xdr_base64(Limits::none())
        .map_err(|e| EnvelopeError::Encode(e.to_string()))
}

/// Hash a signer signs: SHA-256 over (network id, tagged transaction).
pub fn transaction_hash(tx: &Transaction, passphrase: &str) -> Result<[u8; 32], EnvelopeError> {
    let payload = TransactionSignaturePayload {
        network_id: network_id(passphrase),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    let bytes = payload
        .to_xdr(Limits::none())
        .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
    Ok(Sha256::digest(&bytes).into())
}

pub fn envelope_hash_hex(
    envelope: &TransactionEnvelope,
    passphrase: &str,
) -> Result<String, EnvelopeError> {
    match envelope {
        TransactionEnvelope::Tx(v1) => Ok(hex::encode(transaction_hash(&v1.tx, passphrase)?)),
        _ => Err(EnvelopeError::UnsupportedKind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::resolver::{MAINNET_PASSPHRASE, TESTNET_PASSPHRASE};

    #[test]
    fn test_network_ids_differ() {
        assert_ne!(network_id(TESTNET_PASSPHRASE), network_id(MAINNET_PASSPHRASE));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let env = UnsignedEnvelope {
            transaction_xdr: "not-xdr".to_string(),
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
        };
        assert!(matches!(env.decode(), Err(EnvelopeError::Decode(_))));
    }
}
