use axum::{extract::Extension, response::IntoResponse};
use std::sync::Arc;

use super::health::ServiceInfo;

// axum handler for /
pub async fn root(info: Extension<Arc<ServiceInfo>>) -> impl IntoResponse {
    format!("{} service is running", info.service)
}
