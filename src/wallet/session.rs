//! Wallet session state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::types::Balances;
use crate::network::NetworkSelector;

/// Which kind of signing agent backs a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    /// In-page browser extension.
    Extension,
    /// Cross-window remote signer.
    Popup,
    /// Secret key held by this process.
    Local,
    /// Platform-custodied wallet. Never connected or rehydrated here.
    Custodial,
}

impl WalletKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::Extension => "extension",
            WalletKind::Popup => "popup",
            WalletKind::Local => "local",
            WalletKind::Custodial => "custodial",
        }
    }

    /// Whether the user holds their own keys.
    pub fn is_self_custodied(&self) -> bool {
        !matches!(self, WalletKind::Custodial)
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub wallet_kind: WalletKind,
    pub public_key: String,
    /// Every transaction built for this session must target this network.
    pub network: NetworkSelector,
    pub is_connected: bool,
    #[serde(default)]
    pub balances: Balances,
}
