//! Access and refresh token minting and verification.
//!
//! Both kinds are HS256 JWTs. Each kind has its own key, so the access
//! verification path never accepts a refresh token and the other way round.

use super::claims::{Claims, Identity};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::debug;

pub const ACCESS_TTL_SECONDS: i64 = 60 * 60;
pub const REFRESH_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn ttl_seconds(self) -> i64 {
        match self {
            Self::Access => ACCESS_TTL_SECONDS,
            Self::Refresh => REFRESH_TTL_SECONDS,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Malformed, wrongly signed or expired; callers must not tell these apart.
    #[error("invalid or expired token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("invalid token key configuration: {0}")]
    Config(String),
}

/// Signing secrets, one per token kind.
#[derive(Clone)]
pub struct TokenKeys {
    pub access: SecretString,
    pub refresh: SecretString,
}

impl TokenKeys {
    /// # Errors
    /// Returns an error if either secret is empty or both are the same.
    pub fn new(access: SecretString, refresh: SecretString) -> Result<Self, TokenError> {
        if access.expose_secret().is_empty() || refresh.expose_secret().is_empty() {
            return Err(TokenError::Config("signing secrets must not be empty".into()));
        }
        if access.expose_secret() == refresh.expose_secret() {
            return Err(TokenError::Config(
                "access and refresh signing secrets must differ".into(),
            ));
        }
        Ok(Self { access, refresh })
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("access", &"***")
            .field("refresh", &"***")
            .finish()
    }
}

/// Verifies tokens of one kind. Holds only the read-only decoding key.
#[derive(Clone)]
pub struct TokenVerifier {
    kind: TokenKind,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(kind: TokenKind, secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            kind,
            decoding_key: Arc::new(DecodingKey::from_secret(secret.expose_secret().as_bytes())),
            validation: Arc::new(validation),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Decode `token` if its signature verifies and it has not expired.
    ///
    /// # Errors
    /// Returns [`TokenError::Invalid`] for any malformed, mis-signed or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(kind = self.kind.as_str(), error = %e, "token rejected");
            TokenError::Invalid
        })?;

        // jsonwebtoken accepts exp == now; a token is only valid strictly before expiry.
        if data.claims.exp <= Utc::now().timestamp() {
            debug!(kind = self.kind.as_str(), "token rejected: expired");
            return Err(TokenError::Invalid);
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Mints and verifies both token kinds. Only the auth service holds one.
#[derive(Clone)]
pub struct TokenIssuer {
    access_key: Arc<EncodingKey>,
    refresh_key: Arc<EncodingKey>,
    access: TokenVerifier,
    refresh: TokenVerifier,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(keys: &TokenKeys) -> Self {
        Self {
            access_key: Arc::new(EncodingKey::from_secret(
                keys.access.expose_secret().as_bytes(),
            )),
            refresh_key: Arc::new(EncodingKey::from_secret(
                keys.refresh.expose_secret().as_bytes(),
            )),
            access: TokenVerifier::new(TokenKind::Access, &keys.access),
            refresh: TokenVerifier::new(TokenKind::Refresh, &keys.refresh),
        }
    }

    /// Verifier for `kind`, sharing this issuer's keys.
    #[must_use]
    pub fn verifier(&self, kind: TokenKind) -> &TokenVerifier {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// # Errors
    /// Returns an error if signing fails.
    pub fn mint(&self, identity: &Identity, kind: TokenKind) -> Result<String, TokenError> {
        self.mint_at(identity, kind, Utc::now().timestamp())
    }

    /// Mint with an explicit issue time (Unix seconds).
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn mint_at(
        &self,
        identity: &Identity,
        kind: TokenKind,
        issued_at: i64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            identity: identity.clone(),
            iat: issued_at,
            exp: issued_at + kind.ttl_seconds(),
        };
        let key = match kind {
            TokenKind::Access => &self.access_key,
            TokenKind::Refresh => &self.refresh_key,
        };

        encode(&Header::new(Algorithm::HS256), &claims, key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// # Errors
    /// Returns [`TokenError::Invalid`] for any malformed, mis-signed or expired token.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        self.verifier(kind).verify(token)
    }

    /// Exchange a valid refresh token for a new access token.
    ///
    /// The role comes from the refresh token, not from the store, so a role change
    /// only shows up after the refresh token expires and the user logs in again.
    ///
    /// # Errors
    /// Returns [`TokenError::Invalid`] if `refresh_token` is not a valid refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, TokenError> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        self.mint(&claims.identity, TokenKind::Access)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}
