//! Registrations service: acknowledges registrations for the caller.

use super::Message;
use crate::{
    error::{ApiError, ErrorBody},
    gate::AuthContext,
};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub event_id: String,
}

#[utoipa::path(
    post,
    path= "/registrations",
    request_body = RegistrationRequest,
    responses (
        (status = 200, description = "Registration acknowledged", body = Message),
        (status = 400, description = "Missing event id", body = ErrorBody),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "registrations"
)]
#[instrument(skip_all, fields(username = auth.claims.username()))]
pub async fn register(
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    let Json(request) = payload.map_err(|err| ApiError::Validation(err.body_text()))?;
    if request.event_id.trim().is_empty() {
        return Err(ApiError::Validation("eventId must not be empty".to_string()));
    }

    info!(event_id = %request.event_id, "registration acknowledged");

    Ok(Json(Message::new(format!(
        "User {} registered for event {}",
        auth.claims.username(),
        request.event_id
    ))))
}

#[utoipa::path(
    get,
    path= "/registrations",
    responses (
        (status = 200, description = "Registration listing", body = Message),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "registrations"
)]
pub async fn list(Extension(auth): Extension<AuthContext>) -> Json<Message> {
    Json(Message::new(format!(
        "Registrations visible to {}",
        auth.claims.username()
    )))
}
