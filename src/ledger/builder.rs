//! Purchase transaction construction.
//!
//! # Responsibilities
//! - Validate the purchase selection and request parameters
//! - Load the funding account's sequence number (the only I/O here)
//! - Assemble two payments in fixed order: stablecoin to the platform,
//!   credits from the issuing account to the funder
//! - Tag the envelope with the idempotency key and a signing deadline

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use stellar_xdr::curr::{
    AccountId, AlphaNum12, AlphaNum4, Asset, AssetCode12, AssetCode4, Hash, Memo, MuxedAccount,
    Operation, OperationBody, PaymentOp, Preconditions, PublicKey, SequenceNumber, StringM,
    TimeBounds, TimePoint, Transaction, TransactionEnvelope, TransactionExt, TransactionV1Envelope,
    Uint256, VecM,
};
use thiserror::Error;

use crate::config::schema::TransactionConfig;
use crate::ledger::amount::Amount;
use crate::ledger::client::AccountLoader;
use crate::ledger::envelope::{encode_envelope, envelope_hash_hex, EnvelopeError, UnsignedEnvelope};
use crate::ledger::types::LedgerError;
use crate::network::{resolve_network, AssetDescriptor, NetworkSelector};

/// Longest text memo the ledger accepts, in bytes.
pub const MAX_TEXT_MEMO_BYTES: usize = 28;

/// What the buyer picked in the purchase flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditSelection {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<Amount>,
    #[serde(default)]
    pub calculated_price: Option<Amount>,
}

impl CreditSelection {
    pub fn new(project_id: impl Into<String>, quantity: Amount, calculated_price: Amount) -> Self {
        Self {
            project_id: Some(project_id.into()),
            quantity: Some(quantity),
            calculated_price: Some(calculated_price),
        }
    }
}

/// Inputs to a build. Optional fields are checked, not assumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    pub selection: CreditSelection,
    pub wallet_public_key: Option<String>,
    pub network: Option<NetworkSelector>,
    pub idempotency_key: Option<String>,
}

/// Errors raised while building a purchase transaction.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Selection fails its own invariants.
    #[error("invalid selection: {0}")]
    InvalidSelection(&'static str),

    /// Required request parameters are absent.
    #[error("missing parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("invalid public key '{0}'")]
    InvalidPublicKey(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Internal table or arithmetic fault.
    #[error("failed to assemble transaction: {0}")]
    Assembly(String),
}

impl BuildError {
    /// Whether the caller sent a bad request (as opposed to a build failure).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BuildError::InvalidSelection(_)
                | BuildError::MissingParameters(_)
                | BuildError::InvalidPublicKey(_)
        )
    }
}

/// Builds unsigned purchase envelopes.
pub struct TransactionBuilder<L> {
    loader: L,
    base_fee: u32,
    signing_window: Duration,
}

impl<L: AccountLoader> TransactionBuilder<L> {
    /// Create a new transaction builder.
    pub fn new(loader: L, config: &TransactionConfig) -> Self {
        Self {
            loader,
            base_fee: config.base_fee,
            signing_window: Duration::from_secs(config.signing_window_secs),
        }
    }

    /// Build the unsigned two-payment purchase envelope.
    ///
    /// Validation happens before any network call; the first violation wins.
    pub async fn build(&self, request: &BuildRequest) -> Result<UnsignedEnvelope, BuildError> {
        let checked = validate(request)?;
        let funder = decode_address(&checked.funder)
            .map_err(|_| BuildError::InvalidPublicKey(checked.funder.clone()))?;

        let account = self.loader.load_account(&checked.funder, checked.network).await?;
        let profile = resolve_network(checked.network);

        let pay_stablecoin = Operation {
            source_account: None,
            body: OperationBody::Payment(PaymentOp {
                destination: muxed(decode_table_address(profile.platform_address)?),
                asset: xdr_asset(&profile.stablecoin_asset)?,
                amount: checked.price.stroops(),
            }),
        };
        let receive_credits = Operation {
            source_account: Some(muxed(decode_table_address(profile.credit_asset.issuer_address)?)),
            body: OperationBody::Payment(PaymentOp {
                destination: muxed(funder),
                asset: xdr_asset(&profile.credit_asset)?,
                amount: checked.quantity.stroops(),
            }),
        };

        let operations: VecM<Operation, 100> = vec![pay_stablecoin, receive_credits]
            .try_into()
            .map_err(|e: stellar_xdr::curr::Error| BuildError::Assembly(e.to_string()))?;

        let fee = self
            .base_fee
            .checked_mul(operations.len() as u32)
            .ok_or_else(|| BuildError::Assembly("fee overflow".to_string()))?;
        let seq_num = account
            .sequence
            .checked_add(1)
            .ok_or_else(|| BuildError::Assembly("sequence number exhausted".to_string()))?;

        let tx = Transaction {
            source_account: muxed(funder),
            fee,
            seq_num: SequenceNumber(seq_num),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(self.deadline()),
            }),
            memo: memo_for(&checked.idempotency_key)?,
            operations,
            ext: TransactionExt::V0,
        };

        let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
            tx,
            signatures: VecM::default(),
        });

        let hash = envelope_hash_hex(&envelope, profile.protocol_passphrase)?;
        tracing::info!(
            tx_hash = %hash,
            network = %checked.network,
            project_id = %checked.project_id,
            quantity = %checked.quantity,
            price = %checked.price,
            idempotency_key = %checked.idempotency_key,
            "Built purchase transaction"
        );

        Ok(UnsignedEnvelope {
            transaction_xdr: encode_envelope(&envelope)?,
            network_passphrase: profile.protocol_passphrase.to_string(),
        })
    }

    fn deadline(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        now.saturating_add(self.signing_window.as_secs())
    }
}

struct CheckedRequest {
    project_id: String,
    quantity: Amount,
    price: Amount,
    funder: String,
    network: NetworkSelector,
    idempotency_key: String,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate(request: &BuildRequest) -> Result<CheckedRequest, BuildError> {
    let selection = &request.selection;

    let project_id = present(&selection.project_id)
        .ok_or(BuildError::InvalidSelection("selection must name a project"))?;
    let quantity = selection
        .quantity
        .filter(Amount::is_positive)
        .ok_or(BuildError::InvalidSelection("quantity must be greater than zero"))?;
    let price = selection
        .calculated_price
        .filter(Amount::is_positive)
        .ok_or(BuildError::InvalidSelection("calculated price must be greater than zero"))?;

    let funder = present(&request.wallet_public_key);
    let idempotency_key = present(&request.idempotency_key);

    let mut missing = Vec::new();
    if funder.is_none() {
        missing.push("walletPublicKey");
    }
    if request.network.is_none() {
        missing.push("network");
    }
    if idempotency_key.is_none() {
        missing.push("idempotencyKey");
    }

    match (funder, request.network, idempotency_key) {
        (Some(funder), Some(network), Some(idempotency_key)) => Ok(CheckedRequest {
            project_id,
            quantity,
            price,
            funder,
            network,
            idempotency_key,
        }),
        _ => Err(BuildError::MissingParameters(missing)),
    }
}

/// Text memo when the key fits, otherwise a hash memo of the key.
fn memo_for(idempotency_key: &str) -> Result<Memo, BuildError> {
    if idempotency_key.len() <= MAX_TEXT_MEMO_BYTES {
        let text: StringM<28> = idempotency_key
            .as_bytes()
            .to_vec()
            .try_into()
            .map_err(|e: stellar_xdr::curr::Error| BuildError::Assembly(e.to_string()))?;
        Ok(Memo::Text(text))
    } else {
        Ok(Memo::Hash(Hash(Sha256::digest(idempotency_key.as_bytes()).into())))
    }
}

/// Decode a `G...` address into raw key bytes.
pub fn decode_address(address: &str) -> Result<[u8; 32], BuildError> {
    stellar_strkey::ed25519::PublicKey::from_string(address)
        .map(|key| key.0)
        .map_err(|_| BuildError::InvalidPublicKey(address.to_string()))
}

fn decode_table_address(address: &str) -> Result<[u8; 32], BuildError> {
    decode_address(address)
        .map_err(|_| BuildError::Assembly(format!("network table holds invalid address {}", address)))
}

fn muxed(key: [u8; 32]) -> MuxedAccount {
    MuxedAccount::Ed25519(Uint256(key))
}

fn xdr_asset(descriptor: &AssetDescriptor) -> Result<Asset, BuildError> {
    let issuer = AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(decode_table_address(
        descriptor.issuer_address,
    )?)));
    let code = descriptor.code.as_bytes();

    match code.len() {
        1..=4 => {
            let mut buf = [0u8; 4];
            buf[..code.len()].copy_from_slice(code);
            Ok(Asset::CreditAlphanum4(AlphaNum4 {
                asset_code: AssetCode4(buf),
                issuer,
            }))
        }
        5..=12 => {
            let mut buf = [0u8; 12];
            buf[..code.len()].copy_from_slice(code);
            Ok(Asset::CreditAlphanum12(AlphaNum12 {
                asset_code: AssetCode12(buf),
                issuer,
            }))
        }
        _ => Err(BuildError::Assembly(format!("asset code '{}' has invalid length", descriptor.code))),
    }
}
