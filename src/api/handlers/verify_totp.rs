use crate::{
    api::{basic_auth::BasicCredentials, AuthState},
    error::{ApiError, ErrorBody},
    store::StoreError,
    token::{Identity, TokenKind},
};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct VerifyTotpRequest {
    /// Current 6-digit code from the authenticator app.
    pub token: Option<TotpCode>,
}

/// A code sent either as a string or as a bare JSON number.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TotpCode {
    Text(String),
    Number(u32),
}

impl TotpCode {
    /// Numbers lose their leading zeros in JSON; pad them back to `digits`.
    fn into_code(self, digits: usize) -> String {
        match self {
            Self::Text(code) => code,
            Self::Number(n) => format!("{n:0digits$}"),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTotpResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path= "/verify-totp",
    request_body = VerifyTotpRequest,
    responses (
        (status = 200, description = "Code accepted, tokens issued", body = VerifyTotpResponse),
        (status = 400, description = "Missing or malformed TOTP code", body = ErrorBody),
        (status = 401, description = "Wrong password or TOTP code", body = ErrorBody),
        (status = 404, description = "Unknown username", body = ErrorBody),
    ),
    security(("basic" = [])),
    tag= "auth"
)]
#[instrument(skip_all, fields(username = %credentials.username))]
pub async fn verify_totp(
    state: Extension<Arc<AuthState>>,
    credentials: BasicCredentials,
    payload: Result<Json<VerifyTotpRequest>, JsonRejection>,
) -> Result<Json<VerifyTotpResponse>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => VerifyTotpRequest::default(),
        Err(err) => return Err(ApiError::Validation(err.body_text())),
    };
    let code = request
        .token
        .map(|code| code.into_code(state.totp.digits()))
        .filter(|code| !code.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("TOTP code is required".to_string()))?;

    let principal = state
        .credentials
        .find_by_username(&credentials.username)
        .await
        .map_err(|err| match err {
            StoreError::NotFound => ApiError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;

    let password_matches: bool = principal
        .password
        .expose_secret()
        .as_bytes()
        .ct_eq(credentials.password.expose_secret().as_bytes())
        .into();
    if !password_matches {
        warn!("password mismatch");
        return Err(ApiError::authentication("Invalid credentials"));
    }

    let Some(secret) = principal.totp_secret.as_deref() else {
        warn!("principal has no TOTP secret");
        return Err(ApiError::authentication("Invalid TOTP code"));
    };

    if !state.totp.verify(secret, &code)? {
        warn!("TOTP code rejected");
        return Err(ApiError::authentication("Invalid TOTP code"));
    }

    let identity = Identity::from(&principal);
    let access_token = state.tokens.mint(&identity, TokenKind::Access)?;
    let refresh_token = state.tokens.mint(&identity, TokenKind::Refresh)?;

    info!(id = %principal.id, role = %principal.role, "TOTP verified, tokens issued");

    Ok(Json(VerifyTotpResponse {
        message: "TOTP code valid".to_string(),
        access_token,
        refresh_token,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn numeric_code_keeps_leading_zeros() {
        let request: VerifyTotpRequest = serde_json::from_str(r#"{"token": 12345}"#).unwrap();
        assert_eq!(request.token, Some(TotpCode::Number(12_345)));
        assert_eq!(request.token.unwrap().into_code(6), "012345");

        let request: VerifyTotpRequest = serde_json::from_str(r#"{"token": "012345"}"#).unwrap();
        assert_eq!(request.token.unwrap().into_code(6), "012345");
    }

    #[test]
    fn other_json_types_are_rejected() {
        assert!(serde_json::from_str::<VerifyTotpRequest>(r#"{"token": true}"#).is_err());
        assert!(serde_json::from_str::<VerifyTotpRequest>(r#"{"token": -5}"#).is_err());
    }
}
