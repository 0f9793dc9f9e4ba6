use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

/// Privilege level carried by a principal and stamped into its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Assistant,
    Organizer,
    Speaker,
    Admin,
}

impl Role {
    pub const ALL: [Self; 4] = [Self::Assistant, Self::Organizer, Self::Speaker, Self::Admin];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::Organizer => "organizer",
            Self::Speaker => "speaker",
            Self::Admin => "admin",
        }
    }

    /// Parse the persisted `principals.role` textual value into a typed enum.
    fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        value.parse().map_err(|e: UnknownRole| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid principals.role value: {}", e.0),
            )))
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assistant" => Ok(Self::Assistant),
            "organizer" => Ok(Self::Organizer),
            "speaker" => Ok(Self::Speaker),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// A registered account.
///
/// `verified` is persisted with the record but no flow reads or writes it yet.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    /// Stored exactly as submitted; hashing is not part of this store.
    pub password: SecretString,
    pub role: Role,
    pub totp_secret: Option<String>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Principal {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        let password: String = row.try_get("password")?;
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password: SecretString::from(password),
            role: Role::from_db(&role)?,
            totp_secret: row.try_get("totp_secret")?,
            verified: row.try_get("verified")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Input for [`super::CredentialStore::create`]. The caller decides the secret.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub username: String,
    pub password: SecretString,
    pub role: Role,
    pub totp_secret: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Planning,
    Active,
    Finished,
}

impl EventStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "planning" => Ok(Self::Planning),
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            _ => Err(sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid events.status value: {value}"),
            )))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub status: EventStatus,
}

impl<'r> FromRow<'r, PgRow> for Event {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            date: row.try_get("date")?,
            location: row.try_get("location")?,
            capacity: row.try_get("capacity")?,
            status: EventStatus::from_db(&status)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    #[serde(default)]
    pub status: EventStatus,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub status: Option<EventStatus>,
}

impl EventUpdate {
    /// Apply the present fields onto `event`.
    pub fn apply(self, event: &mut Event) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = Some(description);
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(location) = self.location {
            event.location = Some(location);
        }
        if let Some(capacity) = self.capacity {
            event.capacity = Some(capacity);
        }
        if let Some(status) = self.status {
            event.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Organizer".parse::<Role>(), Ok(Role::Organizer));
        assert_eq!(" admin ".parse::<Role>(), Ok(Role::Admin));
        assert!("asistente".parse::<Role>().is_err());
    }

    #[test]
    fn role_defaults_to_assistant() {
        assert_eq!(Role::default(), Role::Assistant);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Role::Speaker).ok().as_deref(),
            Some("\"speaker\"")
        );
    }

    #[test]
    fn event_update_keeps_absent_fields() {
        let mut event = Event {
            id: Uuid::new_v4(),
            title: "RustConf".to_string(),
            description: None,
            date: Utc::now(),
            location: Some("Montreal".to_string()),
            capacity: Some(100),
            status: EventStatus::Planning,
        };
        EventUpdate {
            capacity: Some(120),
            status: Some(EventStatus::Active),
            ..EventUpdate::default()
        }
        .apply(&mut event);

        assert_eq!(event.title, "RustConf");
        assert_eq!(event.location.as_deref(), Some("Montreal"));
        assert_eq!(event.capacity, Some(120));
        assert_eq!(event.status, EventStatus::Active);
    }
}
