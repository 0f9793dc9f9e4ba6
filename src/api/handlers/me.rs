use crate::{error::ErrorBody, gate::AuthContext, token::Claims};
use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MeResponse {
    pub user: Claims,
}

#[utoipa::path(
    get,
    path= "/me",
    responses (
        (status = 200, description = "Claims of the presented access token", body = MeResponse),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid or expired token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "auth"
)]
// axum handler for /me
pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<MeResponse> {
    Json(MeResponse { user: auth.claims })
}
