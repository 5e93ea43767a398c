//! Local key signing.
//!
//! # Security
//! - The secret seed is loaded ONLY from `CARBON_SIGNER_SECRET` or passed in directly
//! - The seed is never logged or serialized
//! - `Debug` shows the public key only

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use stellar_xdr::curr::{DecoratedSignature, Signature, SignatureHint, TransactionEnvelope};

use crate::ledger::envelope::{encode_envelope, transaction_hash, SignedEnvelope, UnsignedEnvelope};
use crate::signing::AgentError;

/// Environment variable holding the `S...` secret seed.
pub const SIGNER_SECRET_ENV_VAR: &str = "CARBON_SIGNER_SECRET";

/// Signs envelopes with an ed25519 key held in process memory.
pub struct LocalKeySigner {
    signing_key: SigningKey,
    public_key: String,
}

impl LocalKeySigner {
    /// Create a signer from a strkey secret seed (`S...`).
    pub fn from_secret(secret: &str) -> Result<Self, AgentError> {
        let seed = stellar_strkey::ed25519::PrivateKey::from_string(secret.trim())
            .map_err(|_| AgentError::Unavailable("invalid secret seed".to_string()))?;
        let signing_key = SigningKey::from_bytes(&seed.0);
        let public_key = encode_public_key(&signing_key.verifying_key());

        tracing::info!(public_key = %public_key, "Local signer initialized");

        Ok(Self {
            signing_key,
            public_key,
        })
    }

    /// Load the signer from `CARBON_SIGNER_SECRET`.
    pub fn from_env() -> Result<Self, AgentError> {
        let secret = std::env::var(SIGNER_SECRET_ENV_VAR).map_err(|_| {
            AgentError::Unavailable(format!("environment variable {} not set", SIGNER_SECRET_ENV_VAR))
        })?;
        Self::from_secret(&secret)
    }

    /// The `G...` address of this key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    fn hint(&self) -> SignatureHint {
        let bytes = self.signing_key.verifying_key().to_bytes();
        SignatureHint([bytes[28], bytes[29], bytes[30], bytes[31]])
    }

    /// Append this key's signature to the envelope.
    pub fn sign(&self, envelope: &UnsignedEnvelope) -> Result<SignedEnvelope, AgentError> {
        let decoded = envelope
            .decode()
            .map_err(|e| AgentError::Failed(e.to_string()))?;
        let TransactionEnvelope::Tx(mut v1) = decoded else {
            return Err(AgentError::Failed(
                "only v1 transaction envelopes can be signed".to_string(),
            ));
        };

        let hash = transaction_hash(&v1.tx, &envelope.network_passphrase)
            .map_err(|e| AgentError::Failed(e.to_string()))?;
        let signature = self.signing_key.sign(&hash);

        let decorated = DecoratedSignature {
            hint: self.hint(),
            signature: Signature(
                signature
                    .to_bytes()
                    .to_vec()
                    .try_into()
                    .map_err(|_| AgentError::Failed("signature encoding failed".to_string()))?,
            ),
        };

        let mut signatures = v1.signatures.to_vec();
        signatures.push(decorated);
        v1.signatures = signatures
            .try_into()
            .map_err(|_| AgentError::Failed("too many signatures on envelope".to_string()))?;

        let transaction_xdr = encode_envelope(&TransactionEnvelope::Tx(v1))
            .map_err(|e| AgentError::Failed(e.to_string()))?;

        tracing::debug!(public_key = %self.public_key, hash = %hex::encode(hash), "Envelope signed locally");

        Ok(SignedEnvelope {
            transaction_xdr,
            network_passphrase: envelope.network_passphrase.clone(),
        })
    }
}

fn encode_public_key(key: &VerifyingKey) -> String {
    stellar_strkey::ed25519::PublicKey(key.to_bytes()).to_string()
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeySigner")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
