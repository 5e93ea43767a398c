//! Network layer.
//!
//! The service listens on plain TCP via `tokio::net::TcpListener`, or on
//! TLS through `axum-server` when `listener.tls` is configured.

pub mod tls;
