use super::valid_username;
use crate::{
    api::{basic_auth::BasicCredentials, AuthState},
    error::{ApiError, ErrorBody},
    store::{NewPrincipal, Role, StoreError},
};
use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct RegisterRequest {
    /// One of `assistant`, `organizer`, `speaker`, `admin`; defaults to `assistant`.
    pub role: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub totp_secret: String,
    /// PNG data URL of the provisioning URI.
    pub qr_code: String,
}

#[utoipa::path(
    post,
    path= "/register",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "Principal registered, TOTP secret provisioned", body = RegisterResponse),
        (status = 400, description = "Username taken, unknown role or invalid username", body = ErrorBody),
        (status = 401, description = "Missing or malformed Basic-Auth credentials", body = ErrorBody),
    ),
    security(("basic" = [])),
    tag= "auth"
)]
#[instrument(skip_all, fields(username = %credentials.username))]
pub async fn register(
    state: Extension<Arc<AuthState>>,
    credentials: BasicCredentials,
    payload: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    if !valid_username(&credentials.username) {
        return Err(ApiError::Validation("Invalid username".to_string()));
    }

    let role = match request.role.as_deref() {
        Some(role) => role
            .parse::<Role>()
            .map_err(|err| ApiError::Validation(err.to_string()))?,
        None => Role::default(),
    };

    let enrollment = state.totp.enroll(&credentials.username)?;
    let qr_code = enrollment.qr_data_url()?;

    let principal = state
        .credentials
        .create(NewPrincipal {
            username: credentials.username,
            password: credentials.password,
            role,
            totp_secret: enrollment.secret.clone(),
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict => {
                warn!("Username already registered");
                ApiError::Conflict("User already exists".to_string())
            }
            other => other.into(),
        })?;

    info!(id = %principal.id, role = %principal.role, "principal registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered".to_string(),
            totp_secret: enrollment.secret,
            qr_code,
        }),
    ))
}
