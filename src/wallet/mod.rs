//! Wallet connector subsystem.
//!
//! # Data Flow
//! ```text
//! connect(kind, network)
//!     → SigningBridge.public_key   (extension / popup / local)
//!     → BalanceSource.balances     (404 reads as zero)
//!     → WalletSession              (persisted to LocalStore)
//! ```

pub mod connector;
pub mod session;
pub mod store;

pub use connector::{WalletConnector, WalletError, WalletResult, SESSION_STORE_KEY};
pub use session::{WalletKind, WalletSession};
pub use store::{LocalStore, StoreError};
