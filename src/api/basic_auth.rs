//! HTTP Basic credentials extractor used by `/register` and `/verify-totp`.

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use base64ct::{Base64, Encoding};
use secrecy::SecretString;

const INVALID_CREDENTIALS: &str = "Invalid credentials (Basic Auth)";

/// Username and password taken from `Authorization: Basic ...`.
#[derive(Debug)]
pub struct BasicCredentials {
    pub username: String,
    pub password: SecretString,
}

impl BasicCredentials {
    /// Both fields must be non-empty; the password may contain colons.
    ///
    /// # Errors
    /// Returns [`ApiError::Authentication`] if the header is absent or malformed.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::authentication(INVALID_CREDENTIALS))?;

        let (scheme, encoded) = value
            .trim()
            .split_once(' ')
            .ok_or_else(|| ApiError::authentication(INVALID_CREDENTIALS))?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(ApiError::authentication(INVALID_CREDENTIALS));
        }

        let decoded = Base64::decode_vec(encoded.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| ApiError::authentication(INVALID_CREDENTIALS))?;

        match decoded.split_once(':') {
            Some((username, password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Self {
                    username: username.to_string(),
                    password: SecretString::from(password.to_string()),
                })
            }
            _ => Err(ApiError::authentication(INVALID_CREDENTIALS)),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BasicCredentials
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use secrecy::ExposeSecret;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn basic(raw: &str) -> HeaderMap {
        headers(&format!("Basic {}", Base64::encode_string(raw.as_bytes())))
    }

    #[test]
    fn parses_username_and_password() {
        let creds = BasicCredentials::from_headers(&basic("alice:pw1")).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password.expose_secret(), "pw1");
    }

    #[test]
    fn password_keeps_colons() {
        let creds = BasicCredentials::from_headers(&basic("alice:a:b:c")).unwrap();
        assert_eq!(creds.password.expose_secret(), "a:b:c");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let value = format!("basic {}", Base64::encode_string(b"bob:secret"));
        assert!(BasicCredentials::from_headers(&headers(&value)).is_ok());
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(BasicCredentials::from_headers(&HeaderMap::new()).is_err());
        assert!(BasicCredentials::from_headers(&headers("Bearer abc")).is_err());
        assert!(BasicCredentials::from_headers(&headers("Basic !!!not-base64")).is_err());
        assert!(BasicCredentials::from_headers(&basic("no-colon")).is_err());
        assert!(BasicCredentials::from_headers(&basic(":pw")).is_err());
        assert!(BasicCredentials::from_headers(&basic("alice:")).is_err());
    }

    #[test]
    fn rejection_is_unauthorized() {
        let err = BasicCredentials::from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "authentication");
    }
}
