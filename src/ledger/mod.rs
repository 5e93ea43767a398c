//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! CreditSelection + funder + network + idempotency key
//!     → builder.rs (validate, load sequence, assemble two payments)
//!     → UnsignedEnvelope            (handed to a signing agent)
//!     → SignedEnvelope              (returned by the agent)
//!     → submit.rs (post, classify result)
//!     → TransactionConfirmation     (hash + explorer URL)
//! ```
//!
//! # Constraints
//! - Amounts are exact 7-decimal fixed point end to end
//! - Every ledger call has a configurable timeout
//! - Nothing here retries; a failed step surfaces to the caller

pub mod amount;
pub mod builder;
pub mod client;
pub mod envelope;
pub mod submit;
pub mod types;

pub use amount::Amount;
pub use builder::{BuildError, BuildRequest, CreditSelection, TransactionBuilder};
pub use client::{AccountLoader, BalanceSource, LedgerClient};
pub use envelope::{SignedEnvelope, TransactionConfirmation, UnsignedEnvelope};
pub use submit::{explorer_url, SubmitError, Submitter};
pub use types::{AccountState, Balances, LedgerError, LedgerResult};
