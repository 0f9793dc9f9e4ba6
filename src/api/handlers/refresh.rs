use crate::{
    api::AuthState,
    error::{ApiError, ErrorBody},
    store::StoreError,
    token::{Identity, TokenError, TokenKind},
};
use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct RefreshRequest {
    /// Refresh token from `/verify-totp`.
    pub token: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

#[utoipa::path(
    post,
    path= "/refresh",
    request_body = RefreshRequest,
    responses (
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Missing refresh token", body = ErrorBody),
        (status = 403, description = "Invalid or expired refresh token", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let token = payload
        .and_then(|Json(request)| request.token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Authentication {
            code: "missing_token",
            message: "Missing refresh token".to_string(),
        })?;

    let access_token = if state.refresh_role_from_store {
        let claims = state.tokens.verify(&token, TokenKind::Refresh)?;
        // A principal that vanished from the store cannot refresh.
        let principal = state
            .credentials
            .find_by_id(claims.identity.id)
            .await
            .map_err(|err| match err {
                StoreError::NotFound => {
                    debug!("refresh for unknown principal {}", claims.identity.id);
                    ApiError::from(TokenError::Invalid)
                }
                other => other.into(),
            })?;
        state
            .tokens
            .mint(&Identity::from(&principal), TokenKind::Access)?
    } else {
        state.tokens.refresh(&token)?
    };

    Ok(Json(RefreshResponse { access_token }))
}
