//! Route handlers for the three services and the helpers they share.

pub mod demo;
pub mod events;
pub mod health;
pub mod me;
pub mod refresh;
pub mod register;
pub mod registrations;
pub mod root;
pub mod verify_totp;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Usernames end up in otpauth labels and log lines, so keep them printable.
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9._@-]{1,64}$").is_ok_and(|re| re.is_match(username))
}

/// Plain `{ "message": ... }` response body.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_username() {
        assert!(valid_username("alice"));
        assert!(valid_username("alice.smith@example.com"));
        assert!(valid_username("bob_2-x"));
        assert!(!valid_username(""));
        assert!(!valid_username("with space"));
        assert!(!valid_username("semi;colon"));
        assert!(!valid_username(&"a".repeat(65)));
    }
}
