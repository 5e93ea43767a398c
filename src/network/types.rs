//! Network selector and asset descriptor types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Logical ledger network chosen for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkSelector {
    /// Public test network.
    #[serde(alias = "test")]
    Testnet,
    /// Production network.
    #[serde(alias = "public", alias = "production")]
    Mainnet,
}

impl NetworkSelector {
    /// All selectable networks.
    pub const ALL: [NetworkSelector; 2] = [NetworkSelector::Testnet, NetworkSelector::Mainnet];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkSelector::Testnet => "testnet",
            NetworkSelector::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for NetworkSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized network name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown network '{0}' (expected testnet or mainnet)")]
pub struct UnknownNetwork(pub String);

impl FromStr for NetworkSelector {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" | "test" => Ok(NetworkSelector::Testnet),
            "mainnet" | "public" | "production" => Ok(NetworkSelector::Mainnet),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}

/// The two asset roles the marketplace trades in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Payment-side token.
    Stablecoin,
    /// Carbon-credit token.
    Credit,
}

/// A fungible ledger asset: code plus issuing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub code: &'static str,
    pub issuer_address: &'static str,
}

/// Everything network-specific the pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub network: NetworkSelector,
    /// Horizon API base URL.
    pub endpoint_base_url: &'static str,
    /// Passphrase mixed into every signature payload.
    pub protocol_passphrase: &'static str,
    pub stablecoin_asset: AssetDescriptor,
    pub credit_asset: AssetDescriptor,
    /// Account receiving stablecoin payments.
    pub platform_address: &'static str,
    /// Label the browser extension expects for this network.
    pub wallet_label: &'static str,
    /// Path segment used by the block explorer.
    pub explorer_segment: &'static str,
}
