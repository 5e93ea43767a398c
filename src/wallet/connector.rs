//! Wallet connector: session lifecycle over the signing bridge.
//!
//! # Responsibilities
//! - Connect through a signing agent and read back the public key
//! - Fetch balances for the connected account
//! - Persist the session on every change; rehydrate it on startup
//! - Refuse custodial sessions on both connect and load

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use thiserror::Error;

use crate::ledger::client::BalanceSource;
use crate::ledger::envelope::{SignedEnvelope, UnsignedEnvelope};
use crate::ledger::types::{Balances, LedgerError};
use crate::network::NetworkSelector;
use crate::signing::{AgentError, SigningBridge};
use crate::wallet::session::{WalletKind, WalletSession};
use crate::wallet::store::{LocalStore, StoreError};

/// Store key holding the serialized session.
pub const SESSION_STORE_KEY: &str = "carbon.wallet.session";

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("{0} wallets are not supported for this flow")]
    UnsupportedKind(WalletKind),

    #[error("signing agent returned an invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("no wallet connected")]
    NotConnected,

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("balance fetch failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Owns the single wallet session of one client.
pub struct WalletConnector {
    bridge: Arc<SigningBridge>,
    ledger: Arc<dyn BalanceSource>,
    store: LocalStore,
    session: ArcSwapOption<WalletSession>,
}

impl WalletConnector {
    pub fn new(bridge: Arc<SigningBridge>, ledger: Arc<dyn BalanceSource>, store: LocalStore) -> Self {
        Self {
            bridge,
            ledger,
            store,
            session: ArcSwapOption::empty(),
        }
    }

    /// The current session, if connected.
    pub fn session(&self) -> Option<WalletSession> {
        self.session.load_full().map(|s| s.as_ref().clone())
    }

    /// Connect a wallet of `kind` on `network`.
    pub async fn connect(&self, kind: WalletKind, network: NetworkSelector) -> WalletResult<WalletSession> {
        if !kind.is_self_custodied() {
            return Err(WalletError::UnsupportedKind(kind));
        }

        let public_key = self.bridge.public_key(kind, network).await?;
        if stellar_strkey::ed25519::PublicKey::from_string(&public_key).is_err() {
            return Err(WalletError::InvalidPublicKey(public_key));
        }

        let balances = self.fetch_balance(&public_key, network).await?;
        let session = WalletSession {
            wallet_kind: kind,
            public_key,
            network,
            is_connected: true,
            balances,
        };
        self.commit(session.clone())?;

        tracing::info!(
            wallet_kind = %kind,
            public_key = %session.public_key,
            network = %network,
            "Wallet connected"
        );
        Ok(session)
    }

    /// Balances of `public_key`; an unfunded account reads as zero.
    pub async fn fetch_balance(&self, public_key: &str, network: NetworkSelector) -> WalletResult<Balances> {
        Ok(self.ledger.balances(public_key, network).await?)
    }

    /// Rehydrate the persisted session and refresh its balances.
    ///
    /// Custodial or unreadable entries are removed and yield `None`.
    pub async fn load_persisted(&self) -> WalletResult<Option<WalletSession>> {
        let Some(raw) = self.store.get(SESSION_STORE_KEY) else {
            return Ok(None);
        };

        let mut session = match serde_json::from_str::<WalletSession>(&raw) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                self.store.remove(SESSION_STORE_KEY)?;
                return Ok(None);
            }
        };

        if !session.wallet_kind.is_self_custodied() {
            tracing::warn!(wallet_kind = %session.wallet_kind, "Discarding persisted custodial session");
            self.store.remove(SESSION_STORE_KEY)?;
            return Ok(None);
        }

        match self.fetch_balance(&session.public_key, session.network).await {
            Ok(balances) => session.balances = balances,
            Err(e) => {
                tracing::warn!(public_key = %session.public_key, error = %e, "Balance refresh failed, keeping stored balances");
            }
        }
        session.is_connected = true;
        self.commit(session.clone())?;

        tracing::info!(wallet_kind = %session.wallet_kind, network = %session.network, "Wallet session restored");
        Ok(Some(session))
    }

    /// Drop the session and its stored entry.
    pub fn disconnect(&self) -> WalletResult<()> {
        self.session.store(None);
        self.store.remove(SESSION_STORE_KEY)?;
        tracing::info!("Wallet disconnected");
        Ok(())
    }

    /// Move the session to `network`, re-reading balances there.
    pub async fn switch_network(&self, network: NetworkSelector) -> WalletResult<WalletSession> {
        let mut session = self.session().ok_or(WalletError::NotConnected)?;
        if session.network == network {
            return Ok(session);
        }
        session.balances = self.fetch_balance(&session.public_key, network).await?;
        session.network = network;
        self.commit(session.clone())?;
        tracing::info!(network = %network, "Wallet network switched");
        Ok(session)
    }

    pub async fn refresh_balances(&self) -> WalletResult<Balances> {
        let mut session = self.session().ok_or(WalletError::NotConnected)?;
        session.balances = self.fetch_balance(&session.public_key, session.network).await?;
        let balances = session.balances.clone();
        self.commit(session)?;
        Ok(balances)
    }

    /// Sign with the connected wallet on the session's network.
    pub async fn sign(&self, envelope: &UnsignedEnvelope) -> WalletResult<SignedEnvelope> {
        let session = self.session().ok_or(WalletError::NotConnected)?;
        Ok(self
            .bridge
            .sign(envelope, session.wallet_kind, session.network)
            .await?)
    }

    fn commit(&self, session: WalletSession) -> WalletResult<()> {
        let raw = serde_json::to_string(&session).map_err(StoreError::from)?;
        self.store.set(SESSION_STORE_KEY, raw)?;
        self.session.store(Some(Arc::new(session)));
        Ok(())
    }
}

impl std::fmt::Debug for WalletConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConnector")
            .field("bridge", &self.bridge)
            .field("session", &self.session())
            .finish_non_exhaustive()
    }
}
