//! HTTP boundary: one axum router per service, sharing middleware and `/health`.

use crate::{
    gate::{RoleGate, RoleSet},
    store::{CredentialStore, EventStore, Role},
    token::TokenIssuer,
    totp::TotpEngine,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post, put},
    Router,
};
use handlers::health::{Dependency, ServiceInfo};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub mod basic_auth;
pub mod handlers;
mod openapi;

pub use openapi::openapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Auth,
    Events,
    Registrations,
}

impl Service {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Events => "events",
            Self::Registrations => "registrations",
        }
    }

    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Auth => 4000,
            Self::Events => 4001,
            Self::Registrations => 4002,
        }
    }
}

/// Everything the auth service handlers need. Immutable after startup.
pub struct AuthState {
    pub credentials: Arc<dyn CredentialStore>,
    pub totp: TotpEngine,
    pub tokens: TokenIssuer,
    /// Re-read the role from the store on `/refresh` instead of trusting the refresh token.
    pub refresh_role_from_store: bool,
}

pub struct EventsState {
    pub events: Arc<dyn EventStore>,
}

/// Middleware options shared by every service.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Exact origin allowed by CORS; any origin when unset.
    pub cors_origin: Option<String>,
}

const ORGANIZERS: RoleSet = RoleSet::empty().with(Role::Organizer).with(Role::Admin);

/// Router of the auth service.
///
/// # Errors
/// Returns an error if the CORS origin is not a valid URL.
pub fn auth_router(state: AuthState, options: &HttpOptions) -> Result<Router> {
    let gate = RoleGate::from_issuer(&state.tokens);
    let info = ServiceInfo::new(
        Service::Auth.name(),
        Dependency::Credentials(state.credentials.clone()),
    );

    let router = Router::new()
        .route("/register", post(handlers::register::register))
        .route("/verify-totp", post(handlers::verify_totp::verify_totp))
        .route("/refresh", post(handlers::refresh::refresh))
        .route(
            "/me",
            get(handlers::me::me).route_layer(gate.allow(RoleSet::all())),
        )
        .route(
            "/schedule",
            get(handlers::demo::schedule).route_layer(gate.allow(RoleSet::all())),
        )
        .route(
            "/enroll",
            post(handlers::demo::enroll).route_layer(gate.allow(Role::Assistant)),
        )
        .route(
            "/create-event",
            post(handlers::demo::create_event).route_layer(gate.allow(ORGANIZERS)),
        )
        .route(
            "/update-agenda",
            put(handlers::demo::update_agenda).route_layer(gate.allow(ORGANIZERS)),
        )
        .route(
            "/my-talk",
            get(handlers::demo::my_talk).route_layer(gate.allow(Role::Speaker)),
        )
        .route(
            "/admin-dashboard",
            get(handlers::demo::admin_dashboard).route_layer(gate.allow(Role::Admin)),
        )
        .layer(Extension(Arc::new(state)));

    finish(router, Service::Auth, info, options)
}

/// Router of the events service.
///
/// # Errors
/// Returns an error if the CORS origin is not a valid URL.
pub fn events_router(state: EventsState, gate: &RoleGate, options: &HttpOptions) -> Result<Router> {
    let info = ServiceInfo::new(
        Service::Events.name(),
        Dependency::Events(state.events.clone()),
    );

    let router = Router::new()
        .route("/", get(handlers::root::root))
        .route(
            "/events",
            post(handlers::events::create)
                .route_layer(gate.allow(ORGANIZERS))
                .merge(
                    get(handlers::events::list).route_layer(gate.allow(RoleSet::all())),
                ),
        )
        .route(
            "/events/:id",
            put(handlers::events::update).route_layer(gate.allow(ORGANIZERS)),
        )
        .route(
            "/admin-dashboard",
            get(handlers::events::admin_dashboard).route_layer(gate.allow(Role::Admin)),
        )
        .layer(Extension(Arc::new(state)));

    finish(router, Service::Events, info, options)
}

/// Router of the registrations service.
///
/// # Errors
/// Returns an error if the CORS origin is not a valid URL.
pub fn registrations_router(gate: &RoleGate, options: &HttpOptions) -> Result<Router> {
    let info = ServiceInfo::new(Service::Registrations.name(), Dependency::None);

    let router = Router::new().route("/", get(handlers::root::root)).route(
        "/registrations",
        post(handlers::registrations::register)
            .route_layer(gate.allow(Role::Assistant))
            .merge(
                get(handlers::registrations::list).route_layer(gate.allow(ORGANIZERS)),
            ),
    );

    finish(router, Service::Registrations, info, options)
}

/// Add `/health`, the `OpenAPI` routes and the shared middleware stack.
fn finish(
    router: Router,
    service: Service,
    info: ServiceInfo,
    options: &HttpOptions,
) -> Result<Router> {
    let cors = cors_layer(options.cors_origin.as_deref())?;

    Ok(router
        .route(
            "/health",
            get(handlers::health::health).options(handlers::health::health),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi(service)))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(Arc::new(info))),
        ))
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS]);

    Ok(match origin {
        Some(origin) => cors
            .allow_origin(AllowOrigin::exact(frontend_origin(origin)?))
            .allow_credentials(true),
        None => cors.allow_origin(Any),
    })
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid CORS origin: {frontend_base_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {frontend_base_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// Serve `app` on `port` until SIGINT or SIGTERM.
///
/// # Errors
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve(service: Service, port: u16, app: Router) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("{} service listening on [::]:{}", service.name(), port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gracefully shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
