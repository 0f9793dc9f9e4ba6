use crate::{
    store::{CredentialStore, EventStore, StoreError},
    GIT_COMMIT_HASH,
};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

/// Store a service depends on, probed by `/health`.
#[derive(Clone)]
pub enum Dependency {
    Credentials(Arc<dyn CredentialStore>),
    Events(Arc<dyn EventStore>),
    None,
}

impl Dependency {
    async fn ping(&self) -> Option<Result<(), StoreError>> {
        match self {
            Self::Credentials(store) => Some(store.ping().await),
            Self::Events(store) => Some(store.ping().await),
            Self::None => None,
        }
    }
}

/// Identity of the running service plus its dependency.
#[derive(Clone)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub dependency: Dependency,
}

impl ServiceInfo {
    #[must_use]
    pub fn new(service: &'static str, dependency: Dependency) -> Self {
        Self {
            service,
            dependency,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    service: String,
    database: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Service and its database are healthy", body = Health),
        (status = 503, description = "Database is unreachable", body = Health)
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, info: Extension<Arc<ServiceInfo>>) -> impl IntoResponse {
    let database = match info.dependency.ping().await {
        Some(Ok(())) => "ok",
        Some(Err(err)) => {
            error!("Database health check failed: {}", err);
            "error"
        }
        None => "none",
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: info.service.to_string(),
        database: database.to_string(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .unwrap_or_else(|err| {
            error!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    if database == "error" {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    } else {
        (StatusCode::OK, headers, body)
    }
}
