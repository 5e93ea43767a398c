//! Carbon-credit marketplace transaction pipeline.
//!
//! Builds unsigned purchase transactions, routes them through a wallet for
//! signing, and submits the signed result to the ledger.

pub mod config;
pub mod http;
pub mod ledger;
pub mod lifecycle;
pub mod net;
pub mod network;
pub mod observability;
pub mod signing;
pub mod wallet;

pub use config::schema::MarketConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
