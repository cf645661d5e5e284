use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Failure taxonomy for the payment pipeline.
///
/// `Display` output doubles as the client-facing envelope message, so each
/// variant carries the exact message to surface.
#[derive(Error, Debug)]
pub enum AppError {
    /// Required request input missing or empty.
    #[error("{message}")]
    Validation { message: String },

    /// Token endpoint failure: non-success status, transport error, or an
    /// unreadable body.
    #[error("{message}")]
    UpstreamAuth { message: String },

    /// Payment or registration call failed in transport. `detail` holds the
    /// provider's JSON failure body when one was returned; it is logged at
    /// the boundary, never echoed to the client.
    #[error("{message}")]
    UpstreamPayment {
        message: String,
        detail: Option<Value>,
    },

    /// Provider payload parsed but an expected field was absent.
    #[error("{message}")]
    MalformedResponse { message: String },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn upstream_auth(message: impl Into<String>) -> Self {
        Self::UpstreamAuth {
            message: message.into(),
        }
    }

    pub fn upstream_payment(message: impl Into<String>, detail: Option<Value>) -> Self {
        Self::UpstreamPayment {
            message: message.into(),
            detail,
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::UpstreamAuth { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamPayment { .. } | Self::MalformedResponse { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::UpstreamPayment {
            detail: Some(detail),
            ..
        } = &self
        {
            tracing::error!(%detail, "provider failure detail");
        }
        tracing::error!(status = %status, error = %self, "request failed");

        let envelope = ErrorEnvelope {
            success: false,
            message: self.to_string(),
        };
        (status, Json(envelope)).into_response()
    }
}
