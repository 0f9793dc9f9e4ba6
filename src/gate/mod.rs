//! Role Gate: bearer extraction, access-token verification and allow-list checks.
//!
//! Flow Overview:
//! 1) Build a [`RequestContext`] from the inbound headers.
//! 2) No `Authorization` header rejects with `MissingToken` before anything else.
//! 3) Verify the bearer as an access token; failure rejects with `InvalidToken`.
//! 4) The decoded role must be in the route's [`RoleSet`], else `Forbidden`.
//! 5) On pass, an [`AuthContext`] is handed to the handler through request extensions.

pub mod layer;
pub mod roles;

pub use layer::{RoleGateLayer, RoleGateMiddleware};
pub use roles::RoleSet;

use crate::store::Role;
use crate::token::{Claims, TokenIssuer, TokenKind, TokenVerifier};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use secrecy::SecretString;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateRejection {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("role {0} is not allowed")]
    Forbidden(Role),
}

impl GateRejection {
    /// Short machine-readable reason.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidToken => "invalid_token",
            Self::Forbidden(_) => "forbidden",
        }
    }
}

/// What the gate knows about a request before authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// `None` when no `Authorization` header was sent. A header that is not a
    /// well-formed `Bearer <token>` yields an empty token, which never verifies.
    bearer: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Self { bearer: None };
        };

        let mut parts = value.to_str().unwrap_or_default().split_whitespace();
        let token = match (parts.next(), parts.next()) {
            (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => token,
            _ => "",
        };

        Self {
            bearer: Some(token.to_string()),
        }
    }

    #[must_use]
    pub fn with_bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
        }
    }

    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }
}

/// Request context after the gate let it through.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token: String,
    pub claims: Claims,
}

/// Stateless authorizer; every service builds its own from the access key.
#[derive(Clone, Debug)]
pub struct RoleGate {
    verifier: TokenVerifier,
}

impl RoleGate {
    /// Gate for services that only hold the access signing secret.
    #[must_use]
    pub fn new(access_secret: &SecretString) -> Self {
        Self {
            verifier: TokenVerifier::new(TokenKind::Access, access_secret),
        }
    }

    /// Gate sharing the access key of an issuer (auth service).
    #[must_use]
    pub fn from_issuer(issuer: &TokenIssuer) -> Self {
        Self {
            verifier: issuer.verifier(TokenKind::Access).clone(),
        }
    }

    /// # Errors
    /// Returns the first failing check as a [`GateRejection`].
    pub fn authorize(
        &self,
        ctx: &RequestContext,
        allowed: RoleSet,
    ) -> Result<AuthContext, GateRejection> {
        let token = ctx.bearer().ok_or(GateRejection::MissingToken)?;

        let claims = self
            .verifier
            .verify(token)
            .map_err(|_| GateRejection::InvalidToken)?;

        if !allowed.contains(claims.role()) {
            return Err(GateRejection::Forbidden(claims.role()));
        }

        Ok(AuthContext {
            token: token.to_string(),
            claims,
        })
    }

    /// Layer enforcing `roles` on the route it is attached to.
    #[must_use]
    pub fn allow(&self, roles: impl Into<RoleSet>) -> RoleGateLayer {
        RoleGateLayer::new(self.clone(), roles.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::token::{Identity, TokenKeys};
    use axum::http::HeaderValue;
    use chrono::Utc;
    use uuid::Uuid;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            &TokenKeys::new(
                SecretString::from("gate-access"),
                SecretString::from("gate-refresh"),
            )
            .unwrap(),
        )
    }

    fn token(issuer: &TokenIssuer, role: Role, kind: TokenKind) -> String {
        issuer
            .mint(
                &Identity {
                    id: Uuid::new_v4(),
                    username: "alice".to_string(),
                    role,
                },
                kind,
            )
            .unwrap()
    }

    fn organizers() -> RoleSet {
        RoleSet::from([Role::Organizer, Role::Admin])
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(RequestContext::from_headers(&headers).bearer(), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(
            RequestContext::from_headers(&headers).bearer(),
            Some("abc.def")
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(RequestContext::from_headers(&headers).bearer(), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YTpi"));
        assert_eq!(RequestContext::from_headers(&headers).bearer(), Some(""));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert_eq!(RequestContext::from_headers(&headers).bearer(), Some(""));
    }

    #[test]
    fn missing_header_is_rejected_first() {
        let gate = RoleGate::from_issuer(&issuer());
        // Even an empty allow-list reports the missing token, not a role problem.
        assert_eq!(
            gate.authorize(&RequestContext::default(), RoleSet::empty())
                .unwrap_err(),
            GateRejection::MissingToken
        );
    }

    #[test]
    fn assistant_is_forbidden_on_organizer_route() {
        let issuer = issuer();
        let gate = RoleGate::from_issuer(&issuer);
        let ctx = RequestContext::with_bearer(token(&issuer, Role::Assistant, TokenKind::Access));

        assert_eq!(
            gate.authorize(&ctx, organizers()).unwrap_err(),
            GateRejection::Forbidden(Role::Assistant)
        );
    }

    #[test]
    fn organizer_passes_with_claims() {
        let issuer = issuer();
        let gate = RoleGate::from_issuer(&issuer);
        let bearer = token(&issuer, Role::Organizer, TokenKind::Access);
        let ctx = RequestContext::with_bearer(bearer.clone());

        let auth = gate.authorize(&ctx, organizers()).unwrap();
        assert_eq!(auth.token, bearer);
        assert_eq!(auth.claims.role(), Role::Organizer);
        assert_eq!(auth.claims.username(), "alice");
    }

    #[test]
    fn refresh_token_is_invalid_at_the_gate() {
        let issuer = issuer();
        let gate = RoleGate::from_issuer(&issuer);
        let ctx = RequestContext::with_bearer(token(&issuer, Role::Admin, TokenKind::Refresh));

        assert_eq!(
            gate.authorize(&ctx, RoleSet::all()).unwrap_err(),
            GateRejection::InvalidToken
        );
    }

    #[test]
    fn expired_or_garbage_token_is_invalid() {
        let issuer = issuer();
        let gate = RoleGate::from_issuer(&issuer);
        let expired = issuer
            .mint_at(
                &Identity {
                    id: Uuid::new_v4(),
                    username: "alice".to_string(),
                    role: Role::Admin,
                },
                TokenKind::Access,
                Utc::now().timestamp() - 7200,
            )
            .unwrap();

        for bearer in [expired, "garbage".to_string(), String::new()] {
            assert_eq!(
                gate.authorize(&RequestContext::with_bearer(bearer), RoleSet::all())
                    .unwrap_err(),
                GateRejection::InvalidToken
            );
        }
    }

    #[test]
    fn gate_built_from_secret_matches_issuer() {
        let issuer = issuer();
        let gate = RoleGate::new(&SecretString::from("gate-access"));
        let ctx = RequestContext::with_bearer(token(&issuer, Role::Speaker, TokenKind::Access));

        assert!(gate.authorize(&ctx, Role::Speaker.into()).is_ok());
    }
}
