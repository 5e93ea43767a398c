//! Error responses.
//!
//! Every failure leaves the service as `{ "error": <stable code>, "message": <text> }`.
//! Validation problems are 400; ledger rejections on submit are 400 with the
//! ledger's result code as `error`; everything else is 500.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::ledger::builder::BuildError;
use crate::ledger::submit::SubmitError;
use crate::ledger::types::LedgerError;
use crate::network::UnknownNetwork;

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("invalid_request", rejection.body_text())
    }
}

impl From<UnknownNetwork> for ApiError {
    fn from(err: UnknownNetwork) -> Self {
        ApiError::bad_request("invalid_network", err.to_string())
    }
}

impl From<BuildError> for ApiError {
    fn from(err: BuildError) -> Self {
        let message = err.to_string();
        match err {
            BuildError::InvalidSelection(_) => ApiError::bad_request("invalid_selection", message),
            BuildError::MissingParameters(_) => ApiError::bad_request("missing_parameters", message),
            BuildError::InvalidPublicKey(_) => ApiError::bad_request("invalid_public_key", message),
            BuildError::Ledger(LedgerError::AccountNotFound(_)) => {
                ApiError::internal("account_not_found", message)
            }
            BuildError::Ledger(_) => ApiError::internal("ledger_unavailable", message),
            BuildError::Envelope(_) | BuildError::Assembly(_) => {
                ApiError::internal("build_failed", message)
            }
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        let message = err.to_string();
        match err {
            SubmitError::InvalidEnvelope(_) => ApiError::bad_request("invalid_envelope", message),
            SubmitError::Unsigned => ApiError::bad_request("unsigned_envelope", message),
            SubmitError::NetworkMismatch { .. } => ApiError::bad_request("invalid_network", message),
            SubmitError::Rejected { code, .. } => ApiError::bad_request(code, message),
            SubmitError::Network(_) => ApiError::internal("submission_failed", message),
        }
    }
}
