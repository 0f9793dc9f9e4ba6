//! # Eventgate (registration, two-factor login and role-gated events)
//!
//! `eventgate` ships three cooperating HTTP services from one binary:
//!
//! - **auth**: registers principals over Basic-Auth, provisions a TOTP secret,
//!   verifies TOTP codes and issues access/refresh tokens.
//! - **events**: event records behind role allow-lists.
//! - **registrations**: event registrations behind role allow-lists.
//!
//! ## Tokens
//!
//! Access tokens live one hour and refresh tokens 24 hours. Each kind is signed
//! with its own HMAC key, so a refresh token never verifies on the access path
//! and vice versa. There is no session store and no revocation list: a token is
//! valid while its signature verifies and it has not expired.
//!
//! ## Role Gate
//!
//! Every protected route declares a [`gate::RoleSet`] when it is registered. The
//! gate extracts the bearer token, verifies it with the access key and checks
//! the embedded role against the route's set. Each service runs the check on its
//! own; nothing is shared between processes except the access key.

pub mod api;
pub mod cli;
pub mod error;
pub mod gate;
pub mod store;
pub mod token;
pub mod totp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }
}
