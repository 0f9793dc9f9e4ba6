//! HTTP-facing error type shared by every service.

use crate::{gate::GateRejection, store::StoreError, token::TokenError, totp::TotpError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Body of every error response.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    Authentication { code: &'static str, message: String },
    #[error("{message}")]
    Authorization { code: &'static str, message: String },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// The cause is logged, never returned.
    #[error("store unavailable: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: "authentication",
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Self::Authorization { .. } => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Authentication { code, .. } | Self::Authorization { code, .. } => *code,
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Store(_) => "store_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Store(_) => "Service temporarily unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Store(_) | Self::Internal(_)) {
            error!("{self}");
        }

        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.public_message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("Record not found".to_string()),
            StoreError::Conflict => Self::Conflict("Record already exists".to_string()),
            StoreError::Unavailable(cause) => Self::Store(cause),
        }
    }
}

impl From<TotpError> for ApiError {
    fn from(err: TotpError) -> Self {
        match err {
            TotpError::InvalidLabel(_) => Self::Validation(err.to_string()),
            TotpError::InvalidSecret(_) | TotpError::Config(_) | TotpError::Qr(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => Self::Authorization {
                code: "invalid_token",
                message: err.to_string(),
            },
            TokenError::Signing(_) | TokenError::Config(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<GateRejection> for ApiError {
    fn from(rejection: GateRejection) -> Self {
        let message = match rejection {
            GateRejection::Forbidden(_) => "Insufficient role for this resource".to_string(),
            _ => rejection.to_string(),
        };
        match rejection {
            GateRejection::MissingToken => Self::Authentication {
                code: rejection.code(),
                message,
            },
            GateRejection::InvalidToken | GateRejection::Forbidden(_) => Self::Authorization {
                code: rejection.code(),
                message,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::Role;

    async fn render(err: ApiError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn conflict_is_bad_request() {
        let (status, body) = render(StoreError::Conflict.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "conflict");
    }

    #[tokio::test]
    async fn store_failure_hides_cause() {
        let (status, body) =
            render(StoreError::Unavailable("connection refused on 10.0.0.1".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "store_unavailable");
        assert!(!body.message.contains("10.0.0.1"));
    }

    #[tokio::test]
    async fn gate_rejections_map_to_401_and_403() {
        let (status, body) = render(GateRejection::MissingToken.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error, "missing_token");

        let (status, body) = render(GateRejection::InvalidToken.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error, "invalid_token");

        let (status, body) = render(GateRejection::Forbidden(Role::Speaker).into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.error, "forbidden");
    }

    #[tokio::test]
    async fn token_errors_never_reveal_cause() {
        let (status, body) = render(TokenError::Invalid.into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.message, "invalid or expired token");
    }

    #[tokio::test]
    async fn totp_issuer_problem_is_internal() {
        let err = TotpError::Config("issuer must not contain ':'".into());
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "internal");

        let (status, body) = render(TotpError::InvalidLabel("colon".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "validation");
    }
}
