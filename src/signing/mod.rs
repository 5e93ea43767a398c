//! Signing bridge.
//!
//! # Data Flow
//! ```text
//! UnsignedEnvelope + WalletKind + network
//!     → SigningBridge (pick agent, check passphrase matches network)
//!     → extension.rs  (in-page extension API)
//!       popup.rs      (cross-window remote signer)
//!       local.rs      (secret key from the environment)
//!     → SignedEnvelope
//! ```
//!
//! Agents never look inside the envelope; they only obtain a signature.
//! At most one connect and one sign may be pending per agent; a second
//! call while one is outstanding fails with `AgentError::Busy`.

pub mod extension;
pub mod local;
pub mod popup;

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::ledger::envelope::{SignedEnvelope, UnsignedEnvelope};
use crate::network::{resolve_network, NetworkSelector};
use crate::wallet::session::WalletKind;

pub use extension::{AccessGrant, ExtensionAgent, ExtensionApi, ExtensionFault};
pub use local::LocalKeySigner;
pub use popup::{LoopbackPopupHost, PopupAgent, PopupHost, PopupWindow, WindowMessage};

/// Failures reported by a signing agent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// Agent not installed, popup blocked, or kind not configured.
    #[error("signing agent unavailable: {0}")]
    Unavailable(String),

    /// User refused to share their public key.
    #[error("user declined wallet access")]
    PermissionRejected,

    /// User closed the signer without acting.
    #[error("user cancelled the wallet request")]
    UserCancelled,

    /// User or agent refused to sign.
    #[error("signing rejected: {0}")]
    Rejected(String),

    #[error("wallet request timed out after {0} seconds")]
    Timeout(u64),

    /// A request of the same kind is still pending on this agent.
    #[error("another wallet request is already pending")]
    Busy,

    /// Envelope passphrase does not belong to the session's network.
    #[error("envelope is not for the {network} network")]
    NetworkMismatch { network: NetworkSelector },

    #[error("wallet error: {0}")]
    Failed(String),
}

const REFUSAL_PATTERNS: [&str; 5] = ["declined", "rejected", "denied", "cancel", "refused"];

/// Whether an agent's error text means the user said no.
pub(crate) fn is_refusal(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    REFUSAL_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Single-flight flag for one kind of request on one agent.
#[derive(Debug, Default)]
pub(crate) struct InFlight(AtomicBool);

pub(crate) struct InFlightGuard<'a>(&'a AtomicBool);

impl InFlight {
    pub(crate) fn begin(&self) -> Result<InFlightGuard<'_>, AgentError> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(&self.0))
            .map_err(|_| AgentError::Busy)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One configured signing agent.
#[derive(Debug)]
pub enum SigningAgent {
    Extension(ExtensionAgent),
    Popup(PopupAgent),
    Local(LocalKeySigner),
}

impl SigningAgent {
    pub fn kind(&self) -> WalletKind {
        match self {
            SigningAgent::Extension(_) => WalletKind::Extension,
            SigningAgent::Popup(_) => WalletKind::Popup,
            SigningAgent::Local(_) => WalletKind::Local,
        }
    }

    /// Ask the agent for the user's public key.
    pub async fn public_key(&self, network: NetworkSelector) -> Result<String, AgentError> {
        match self {
            SigningAgent::Extension(agent) => {
                let grant = agent.connect().await?;
                match &grant {
                    AccessGrant::AlreadyConnected(_) => {
                        tracing::debug!("Extension already authorized");
                    }
                    AccessGrant::Granted(_) => tracing::info!("Extension access granted"),
                }
                Ok(grant.into_public_key())
            }
            SigningAgent::Popup(agent) => agent.request_public_key(network).await,
            SigningAgent::Local(signer) => Ok(signer.public_key().to_string()),
        }
    }

    /// Obtain a signature on `envelope` for `network`.
    pub async fn sign(
        &self,
        envelope: &UnsignedEnvelope,
        network: NetworkSelector,
    ) -> Result<SignedEnvelope, AgentError> {
        let profile = resolve_network(network);
        if envelope.network_passphrase != profile.protocol_passphrase {
            return Err(AgentError::NetworkMismatch { network });
        }

        let signed_xdr = match self {
            SigningAgent::Extension(agent) => {
                agent.sign(&envelope.transaction_xdr, profile.wallet_label).await?
            }
            SigningAgent::Popup(agent) => agent.sign(&envelope.transaction_xdr, network).await?,
            SigningAgent::Local(signer) => return signer.sign(envelope),
        };

        Ok(SignedEnvelope {
            transaction_xdr: signed_xdr,
            network_passphrase: envelope.network_passphrase.clone(),
        })
    }
}

/// Registry of configured agents, dispatched by wallet kind.
#[derive(Debug, Default)]
pub struct SigningBridge {
    agents: Vec<SigningAgent>,
}

impl SigningBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, replacing any previous agent of the same kind.
    pub fn with_agent(mut self, agent: SigningAgent) -> Self {
        self.agents.retain(|a| a.kind() != agent.kind());
        self.agents.push(agent);
        self
    }

    pub fn agent(&self, kind: WalletKind) -> Result<&SigningAgent, AgentError> {
        self.agents
            .iter()
            .find(|a| a.kind() == kind)
            .ok_or_else(|| AgentError::Unavailable(format!("no {} signing agent configured", kind)))
    }

    pub async fn public_key(
        &self,
        kind: WalletKind,
        network: NetworkSelector,
    ) -> Result<String, AgentError> {
        self.agent(kind)?.public_key(network).await
    }

    pub async fn sign(
        &self,
        envelope: &UnsignedEnvelope,
        kind: WalletKind,
        network: NetworkSelector,
    ) -> Result<SignedEnvelope, AgentError> {
        let result = self.agent(kind)?.sign(envelope, network).await;
        if let Err(e) = &result {
            tracing::warn!(wallet_kind = %kind, network = %network, error = %e, "Signing failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::resolver::MAINNET_PASSPHRASE;

    const SECRET: &str = "SADQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQOBYHA4DQP54X";

    #[test]
    fn test_refusal_patterns() {
        assert!(is_refusal("User declined access"));
        assert!(is_refusal("Transaction Rejected"));
        assert!(is_refusal("The user cancelled the request"));
        assert!(!is_refusal("Internal error"));
    }

    #[test]
    fn test_in_flight_is_exclusive() {
        let flight = InFlight::default();
        let guard = flight.begin().unwrap();
        assert_eq!(flight.begin().err(), Some(AgentError::Busy));
        drop(guard);
        assert!(flight.begin().is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_kind_is_unavailable() {
        let bridge = SigningBridge::new()
            .with_agent(SigningAgent::Local(LocalKeySigner::from_secret(SECRET).unwrap()));
        let err = bridge
            .public_key(WalletKind::Popup, NetworkSelector::Testnet)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Unavailable(_)));

        let key = bridge
            .public_key(WalletKind::Local, NetworkSelector::Testnet)
            .await
            .unwrap();
        assert!(key.starts_with('G'));
    }

    #[tokio::test]
    async fn test_mismatched_network_is_refused() {
        let bridge = SigningBridge::new()
            .with_agent(SigningAgent::Local(LocalKeySigner::from_secret(SECRET).unwrap()));
        let envelope = UnsignedEnvelope {
            transaction_xdr: "AAAA".to_string(),
            network_passphrase: MAINNET_PASSPHRASE.to_string(),
        };
        let err = bridge
            .sign(&envelope, WalletKind::Local, NetworkSelector::Testnet)
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::NetworkMismatch { network: NetworkSelector::Testnet });
    }
}
