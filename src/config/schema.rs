//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! marketplace service. All types derive Serde traits for deserialization
//! from config files, and every field has a default.

use serde::{Deserialize, Serialize};

/// Root configuration for the marketplace service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MarketConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// HTTP handler deadlines.
    pub timeouts: TimeoutConfig,

    /// Ledger endpoints and timeouts.
    pub ledger: LedgerConfig,

    /// Transaction construction parameters.
    pub transactions: TransactionConfig,

    /// Signing agent settings.
    pub wallet: WalletConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one HTTP request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Ledger API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Override of the test network's API base URL.
    pub testnet_url: Option<String>,

    /// Override of the production network's API base URL.
    pub mainnet_url: Option<String>,

    /// Timeout for every outbound ledger call, in seconds.
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            testnet_url: None,
            mainnet_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TransactionConfig {
    /// Fee per operation in stroops.
    pub base_fee: u32,

    /// Seconds after which a built envelope is no longer accepted.
    pub signing_window_secs: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            base_fee: 100,
            signing_window_secs: 300,
        }
    }
}

/// Signing agent configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WalletConfig {
    /// Page of the remote signer opened in a popup.
    pub popup_signer_url: String,

    pub connect_timeout_secs: u64,

    pub sign_timeout_secs: u64,

    /// How often a pending popup is checked for having been closed.
    pub poll_interval_ms: u64,

    /// File holding the persisted wallet session (CLI only).
    pub session_path: Option<String>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            popup_signer_url: "https://signer.carbon-market.app/confirm".to_string(),
            connect_timeout_secs: 60,
            sign_timeout_secs: 120,
            poll_interval_ms: 500,
            session_path: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 256 * 1024,
        }
    }
}
