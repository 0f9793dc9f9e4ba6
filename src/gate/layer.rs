//! Per-route tower layer running the Role Gate before the handler.

use super::{RequestContext, RoleGate, RoleSet};
use crate::error::ApiError;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct RoleGateLayer {
    gate: RoleGate,
    allowed: RoleSet,
}

impl RoleGateLayer {
    #[must_use]
    pub fn new(gate: RoleGate, allowed: RoleSet) -> Self {
        Self { gate, allowed }
    }
}

impl<S> Layer<S> for RoleGateLayer {
    type Service = RoleGateMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RoleGateMiddleware {
            inner,
            gate: self.gate.clone(),
            allowed: self.allowed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RoleGateMiddleware<S> {
    inner: S,
    gate: RoleGate,
    allowed: RoleSet,
}

impl<S> Service<Request<Body>> for RoleGateMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        // Keep the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let ctx = RequestContext::from_headers(req.headers());
        let outcome = self.gate.authorize(&ctx, self.allowed);

        Box::pin(async move {
            match outcome {
                Ok(auth) => {
                    req.extensions_mut().insert(auth);
                    inner.call(req).await
                }
                Err(rejection) => {
                    warn!(
                        path = %req.uri().path(),
                        reason = rejection.code(),
                        "request rejected by role gate: {rejection}"
                    );
                    Ok(ApiError::from(rejection).into_response())
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gate::AuthContext;
    use crate::store::Role;
    use crate::token::{Identity, TokenIssuer, TokenKeys, TokenKind};
    use axum::{
        http::{header::AUTHORIZATION, Method, StatusCode},
        routing::get,
        Extension, Router,
    };
    use secrecy::SecretString;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            &TokenKeys::new(
                SecretString::from("layer-access"),
                SecretString::from("layer-refresh"),
            )
            .unwrap(),
        )
    }

    fn app(issuer: &TokenIssuer) -> Router {
        let gate = RoleGate::from_issuer(issuer);
        Router::new().route(
            "/admin",
            get(|Extension(auth): Extension<AuthContext>| async move {
                auth.claims.username().to_string()
            })
            .route_layer(gate.allow(Role::Admin)),
        )
    }

    fn bearer(issuer: &TokenIssuer, role: Role) -> String {
        let token = issuer
            .mint(
                &Identity {
                    id: Uuid::new_v4(),
                    username: "root".to_string(),
                    role,
                },
                TokenKind::Access,
            )
            .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn passes_claims_to_handler() {
        let issuer = issuer();
        let response = app(&issuer)
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .header(AUTHORIZATION, bearer(&issuer, Role::Admin))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"root");
    }

    #[tokio::test]
    async fn maps_rejections_to_status_codes() {
        let issuer = issuer();

        let missing = app(&issuer)
            .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid = app(&issuer)
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .header(AUTHORIZATION, "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::FORBIDDEN);

        let forbidden = app(&issuer)
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .header(AUTHORIZATION, bearer(&issuer, Role::Speaker))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unsupported_method_is_not_gated() {
        let response = app(&issuer())
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
