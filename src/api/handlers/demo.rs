//! Role-gated routes of the auth service. Each one only confirms that the
//! caller's role passed the allow-list registered with the route.

use super::Message;
use crate::{error::ErrorBody, gate::AuthContext};
use axum::{extract::Extension, Json};
use tracing::debug;

fn granted(auth: &AuthContext, message: &str) -> Json<Message> {
    debug!(username = auth.claims.username(), role = %auth.claims.role(), "{message}");
    Json(Message::new(message))
}

#[utoipa::path(
    get,
    path= "/schedule",
    responses (
        (status = 200, description = "Any authenticated role", body = Message),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "gated"
)]
pub async fn schedule(Extension(auth): Extension<AuthContext>) -> Json<Message> {
    granted(&auth, "Access to the schedule")
}

#[utoipa::path(
    post,
    path= "/enroll",
    responses (
        (status = 200, description = "Assistants only", body = Message),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "gated"
)]
pub async fn enroll(Extension(auth): Extension<AuthContext>) -> Json<Message> {
    granted(&auth, "Enrollment successful")
}

#[utoipa::path(
    post,
    path= "/create-event",
    responses (
        (status = 200, description = "Organizers and admins", body = Message),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "gated"
)]
pub async fn create_event(Extension(auth): Extension<AuthContext>) -> Json<Message> {
    granted(&auth, "Event created")
}

#[utoipa::path(
    put,
    path= "/update-agenda",
    responses (
        (status = 200, description = "Organizers and admins", body = Message),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "gated"
)]
pub async fn update_agenda(Extension(auth): Extension<AuthContext>) -> Json<Message> {
    granted(&auth, "Agenda updated")
}

#[utoipa::path(
    get,
    path= "/my-talk",
    responses (
        (status = 200, description = "Speakers only", body = Message),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "gated"
)]
pub async fn my_talk(Extension(auth): Extension<AuthContext>) -> Json<Message> {
    granted(&auth, "These are your talks")
}

#[utoipa::path(
    get,
    path= "/admin-dashboard",
    responses (
        (status = 200, description = "Admins only", body = Message),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "gated"
)]
pub async fn admin_dashboard(Extension(auth): Extension<AuthContext>) -> Json<Message> {
    granted(&auth, "Full administrator dashboard")
}
