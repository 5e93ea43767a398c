//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, fee > 0)
//! - Check that addresses and URLs parse
//!
//! Returns all validation errors, not just the first.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::MarketConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e))),
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::new(field, "must be greater than zero"));
    }
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &MarketConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::new("listener.tls", "cert_path and key_path are required"));
        }
    }

    check_positive(&mut errors, "timeouts.request_secs", config.timeouts.request_secs);

    if let Some(url) = &config.ledger.testnet_url {
        check_url(&mut errors, "ledger.testnet_url", url);
    }
    if let Some(url) = &config.ledger.mainnet_url {
        check_url(&mut errors, "ledger.mainnet_url", url);
    }
    check_positive(&mut errors, "ledger.timeout_secs", config.ledger.timeout_secs);

    check_positive(&mut errors, "transactions.base_fee", config.transactions.base_fee.into());
    check_positive(
        &mut errors,
        "transactions.signing_window_secs",
        config.transactions.signing_window_secs,
    );

    check_url(&mut errors, "wallet.popup_signer_url", &config.wallet.popup_signer_url);
    check_positive(&mut errors, "wallet.connect_timeout_secs", config.wallet.connect_timeout_secs);
    check_positive(&mut errors, "wallet.sign_timeout_secs", config.wallet.sign_timeout_secs);
    check_positive(&mut errors, "wallet.poll_interval_ms", config.wallet.poll_interval_ms);

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
