//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum router, middleware stack)
//!     → request.rs (request ID extraction)
//!     → handlers.rs (build / submit / health / networks)
//!     → response.rs (error bodies with stable codes)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, X_REQUEST_ID};
pub use response::{ApiError, ErrorBody};
pub use server::{AppState, HttpServer, InnerState};
