//! Events service: event records behind role allow-lists.

use super::Message;
use crate::{
    api::EventsState,
    error::{ApiError, ErrorBody},
    gate::AuthContext,
    store::{Event, EventUpdate, NewEvent},
};
use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

fn check_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }
    Ok(())
}

fn check_capacity(capacity: Option<i32>) -> Result<(), ApiError> {
    if capacity.is_some_and(|capacity| capacity < 0) {
        return Err(ApiError::Validation(
            "capacity must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path= "/events",
    request_body = NewEvent,
    responses (
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid event", body = ErrorBody),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "events"
)]
#[instrument(skip_all, fields(username = auth.claims.username()))]
pub async fn create(
    state: Extension<Arc<EventsState>>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let Json(event) = payload.map_err(|err| ApiError::Validation(err.body_text()))?;
    check_title(&event.title)?;
    check_capacity(event.capacity)?;

    let event = state.events.create(event).await?;
    info!(id = %event.id, "event created");

    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    get,
    path= "/events",
    responses (
        (status = 200, description = "Event schedule ordered by date", body = [Event]),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "events"
)]
#[instrument(skip_all)]
pub async fn list(state: Extension<Arc<EventsState>>) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.events.list().await?))
}

#[utoipa::path(
    put,
    path= "/events/{id}",
    params(("id" = Uuid, Path, description = "Event id")),
    request_body = EventUpdate,
    responses (
        (status = 200, description = "Event updated", body = Event),
        (status = 400, description = "Invalid update", body = ErrorBody),
        (status = 401, description = "No bearer token", body = ErrorBody),
        (status = 403, description = "Invalid token or role not allowed", body = ErrorBody),
        (status = 404, description = "Unknown event", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "events"
)]
#[instrument(skip_all, fields(id = %id))]
pub async fn update(
    state: Extension<Arc<EventsState>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<EventUpdate>, JsonRejection>,
) -> Result<Json<Event>, ApiError> {
    let Json(update) = payload.map_err(|err| ApiError::Validation(err.body_text()))?;
    if let Some(title) = update.title.as_deref() {
        check_title(title)?;
    }
    check_capacity(update.capacity)?;

    let event = state.events.update(id, update).await?;
    info!("event updated");

    Ok(Json(event))
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
    tag= "events"
)]
pub async fn admin_dashboard(Extension(auth): Extension<AuthContext>) -> Json<Message> {
    Json(Message::new(format!(
        "Event administration dashboard for {}",
        auth.claims.username()
    )))
}
