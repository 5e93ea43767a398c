//! Static network table.
//!
//! # Responsibilities
//! - Map a `NetworkSelector` to Horizon URL, passphrase and addresses
//! - Look up asset descriptors by (kind, network)
//!
//! No I/O. The table is exhaustive over both enums, so an unknown
//! (kind, network) pair cannot be expressed.

use crate::network::types::{AssetDescriptor, AssetKind, NetworkProfile, NetworkSelector};

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const MAINNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

const TESTNET_HORIZON: &str = "https://horizon-testnet.stellar.org";
const MAINNET_HORIZON: &str = "https://horizon.stellar.org";

const STABLECOIN_CODE: &str = "USDC";
const CREDIT_CODE: &str = "CARBON";

const TESTNET_USDC_ISSUER: &str = "GBBD47IF6LWK7P7MDEVSCWR7DPUWV3NY3DTQEVFL4NAT4AQH3ZLLFLA5";
const MAINNET_USDC_ISSUER: &str = "GA5ZSEJYB37JRC5AVCIA5MOP4RHTM335X2KGX3IHOJAPP5RE34K4KZVN";

const TESTNET_CREDIT_ISSUER: &str = "GD4ZMFIRM4CPBHZ34DGE3ZTZZV6TR3YMCSAH4VQ3SH44GDCDU5G7TBDK";
const MAINNET_CREDIT_ISSUER: &str = "GBTUFBIOK2YK6E5I2UYN3M4IC54GTX5TVG6E2UBMKL6SXSRT7JGLT3WD";

const TESTNET_PLATFORM: &str = "GBMMNLC4M7VLYLMLW3GZDUVJKWHCVWBCLQWN64L3DV5E5EEZ34IWVAVP";
const MAINNET_PLATFORM: &str = "GCKO7XNBXKMV6YWCWK2FACF772O3BTVPXMJJC3AHMMKBK4AAXCMK5ZUS";

/// Block explorer root; the network segment and `/tx/{hash}` are appended.
pub const EXPLORER_BASE_URL: &str = "https://stellar.expert/explorer";

/// Resolve every network-specific constant for `selector`.
pub fn resolve_network(selector: NetworkSelector) -> NetworkProfile {
    match selector {
        NetworkSelector::Testnet => NetworkProfile {
            network: selector,
            endpoint_base_url: TESTNET_HORIZON,
            protocol_passphrase: TESTNET_PASSPHRASE,
            stablecoin_asset: asset(AssetKind::Stablecoin, selector),
            credit_asset: asset(AssetKind::Credit, selector),
            platform_address: TESTNET_PLATFORM,
            wallet_label: "TESTNET",
            explorer_segment: "testnet",
        },
        NetworkSelector::Mainnet => NetworkProfile {
            network: selector,
            endpoint_base_url: MAINNET_HORIZON,
            protocol_passphrase: MAINNET_PASSPHRASE,
            stablecoin_asset: asset(AssetKind::Stablecoin, selector),
            credit_asset: asset(AssetKind::Credit, selector),
            platform_address: MAINNET_PLATFORM,
            wallet_label: "PUBLIC",
            explorer_segment: "public",
        },
    }
}

/// Asset descriptor for `kind` on `network`.
pub fn asset(kind: AssetKind, network: NetworkSelector) -> AssetDescriptor {
    let (code, issuer_address) = match (kind, network) {
        (AssetKind::Stablecoin, NetworkSelector::Testnet) => (STABLECOIN_CODE, TESTNET_USDC_ISSUER),
        (AssetKind::Stablecoin, NetworkSelector::Mainnet) => (STABLECOIN_CODE, MAINNET_USDC_ISSUER),
        (AssetKind::Credit, NetworkSelector::Testnet) => (CREDIT_CODE, TESTNET_CREDIT_ISSUER),
        (AssetKind::Credit, NetworkSelector::Mainnet) => (CREDIT_CODE, MAINNET_CREDIT_ISSUER),
    };
    AssetDescriptor { code, issuer_address }
}

/// Find the network whose passphrase is `passphrase`.
pub fn network_for_passphrase(passphrase: &str) -> Option<NetworkSelector> {
    NetworkSelector::ALL
        .into_iter()
        .find(|n| resolve_network(*n).protocol_passphrase == passphrase)
}
