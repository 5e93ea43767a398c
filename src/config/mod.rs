//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, path from CARBON_MARKET_CONFIG)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MarketConfig (validated, immutable)
//!     → shared via ArcSwap with the HTTP server
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads and validates
//!     → server swaps in new state atomically
//! ```
//!
//! All fields have defaults so an empty file is a valid config.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError, CONFIG_ENV_VAR};
pub use schema::{
    LedgerConfig, ListenerConfig, MarketConfig, TransactionConfig, WalletConfig,
};
