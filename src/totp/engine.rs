//! TOTP secret provisioning and code verification (RFC 6238, SHA-1, 30 s step).

use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::debug;

/// 160-bit shared secret, the size RFC 4226 recommends.
const SECRET_BYTES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("invalid TOTP secret: {0}")]
    InvalidSecret(String),
    #[error("invalid enrollment label: {0}")]
    InvalidLabel(String),
    #[error("invalid TOTP configuration: {0}")]
    Config(String),
    #[error("QR generation failed: {0}")]
    Qr(String),
}

#[derive(Debug, Clone)]
pub struct TotpConfig {
    /// Issuer shown in authenticator apps.
    pub issuer: String,
    pub digits: usize,
    /// Time step in seconds.
    pub step: u64,
    /// Number of neighbouring steps accepted on each side.
    pub skew: u8,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: "AuthApp".to_string(),
            digits: 6,
            step: 30,
            skew: 1,
        }
    }
}

impl TotpConfig {
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Self::default()
        }
    }

    /// Check that an otpauth URI can be built with these settings.
    ///
    /// # Errors
    /// Returns [`TotpError::Config`] if the issuer contains `:` or the other
    /// settings are rejected by the TOTP library.
    pub fn validate(&self) -> Result<(), TotpError> {
        if self.issuer.contains(':') {
            return Err(TotpError::Config(format!(
                "issuer must not contain ':': {}",
                self.issuer
            )));
        }

        TOTP::new(
            Algorithm::SHA1,
            self.digits,
            self.skew,
            self.step,
            vec![0u8; SECRET_BYTES],
            Some(self.issuer.clone()),
            "account".to_string(),
        )
        .map(|_| ())
        .map_err(|e| TotpError::Config(e.to_string()))
    }
}

/// Freshly generated secret plus its provisioning URI.
pub struct Enrollment {
    pub secret: String,
    pub uri: String,
    totp: TOTP,
}

impl Enrollment {
    /// Render the provisioning URI as a PNG QR code data URL.
    ///
    /// # Errors
    /// Returns an error if the QR image cannot be produced.
    pub fn qr_data_url(&self) -> Result<String, TotpError> {
        let png = self.totp.get_qr_base64().map_err(TotpError::Qr)?;
        Ok(format!("data:image/png;base64,{png}"))
    }
}

impl std::fmt::Debug for Enrollment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enrollment")
            .field("secret", &"***")
            .field("uri", &"otpauth://***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TotpEngine {
    config: TotpConfig,
}

impl TotpEngine {
    #[must_use]
    pub fn new(config: TotpConfig) -> Self {
        Self { config }
    }

    /// Build an engine after [`TotpConfig::validate`] accepts `config`.
    ///
    /// # Errors
    /// Returns [`TotpError::Config`] for an unusable issuer or settings.
    pub fn try_new(config: TotpConfig) -> Result<Self, TotpError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn digits(&self) -> usize {
        self.config.digits
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }

    /// Generate a new secret for `label` (the account name shown in the app).
    ///
    /// # Errors
    /// Returns an error if the label or issuer cannot be embedded in an otpauth URI.
    pub fn enroll(&self, label: &str) -> Result<Enrollment, TotpError> {
        self.config.validate()?;

        let mut bytes = vec![0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let secret = Secret::Raw(bytes.clone()).to_encoded().to_string();

        let totp = TOTP::new(
            Algorithm::SHA1,
            self.config.digits,
            self.config.skew,
            self.config.step,
            bytes,
            Some(self.config.issuer.clone()),
            label.to_string(),
        )
        .map_err(|e| TotpError::InvalidLabel(e.to_string()))?;

        let uri = totp.get_url();

        Ok(Enrollment { secret, uri, totp })
    }

    /// Check `code` against `secret` at the current time.
    ///
    /// A wrong code is `Ok(false)`; only a secret that cannot be decoded is an error.
    ///
    /// # Errors
    /// Returns [`TotpError::InvalidSecret`] for malformed base32 input.
    pub fn verify(&self, secret: &str, code: &str) -> Result<bool, TotpError> {
        self.verify_at(secret, code, now())
    }

    /// Check `code` against `secret` at `unix_time`.
    ///
    /// # Errors
    /// Returns [`TotpError::InvalidSecret`] for malformed base32 input.
    pub fn verify_at(&self, secret: &str, code: &str, unix_time: u64) -> Result<bool, TotpError> {
        let totp = self.build(secret)?;

        // Authenticator apps sometimes display "123 456" or "123-456".
        let code = code.replace([' ', '-'], "");
        if code.len() != self.config.digits || !code.bytes().all(|b| b.is_ascii_digit()) {
            debug!("rejecting malformed TOTP code");
            return Ok(false);
        }

        Ok(totp.check(&code, unix_time))
    }

    /// The code a correctly configured authenticator shows at `unix_time`.
    ///
    /// # Errors
    /// Returns [`TotpError::InvalidSecret`] for malformed base32 input.
    pub fn code_at(&self, secret: &str, unix_time: u64) -> Result<String, TotpError> {
        Ok(self.build(secret)?.generate(unix_time))
    }

    fn build(&self, secret: &str) -> Result<TOTP, TotpError> {
        let bytes = Secret::Encoded(secret.trim().to_string())
            .to_bytes()
            .map_err(|e| TotpError::InvalidSecret(format!("{e:?}")))?;
        if bytes.is_empty() {
            return Err(TotpError::InvalidSecret("empty secret".to_string()));
        }

        // Verification does not need the URI constraints enforced by `TOTP::new`.
        Ok(TOTP::new_unchecked(
            Algorithm::SHA1,
            self.config.digits,
            self.config.skew,
            self.config.step,
            bytes,
            Some(self.config.issuer.clone()),
            String::new(),
        ))
    }
}

fn now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
