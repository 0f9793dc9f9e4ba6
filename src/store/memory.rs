use super::{
    models::{Event, EventUpdate, NewEvent, NewPrincipal, Principal},
    CredentialStore, EventStore, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Credential store kept in process memory, keyed by username.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    principals: RwLock<HashMap<String, Principal>>,
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Principal, StoreError> {
        self.principals
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Principal, StoreError> {
        self.principals
            .read()
            .await
            .values()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, principal: NewPrincipal) -> Result<Principal, StoreError> {
        // Check and insert under the same write guard.
        let mut principals = self.principals.write().await;
        if principals.contains_key(&principal.username) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let record = Principal {
            id: Uuid::new_v4(),
            username: principal.username,
            password: principal.password,
            role: principal.role,
            totp_secret: Some(principal.totp_secret),
            verified: false,
            created_at: now,
            updated_at: now,
        };
        principals.insert(record.username.clone(), record.clone());

        Ok(record)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<Event>>,
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create(&self, event: NewEvent) -> Result<Event, StoreError> {
        let record = Event {
            id: Uuid::new_v4(),
            title: event.title,
            description: event.description,
            date: event.date,
            location: event.location,
            capacity: event.capacity,
            status: event.status,
        };
        self.events.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<Event>, StoreError> {
        let mut events = self.events.read().await.clone();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }

    async fn update(&self, id: Uuid, update: EventUpdate) -> Result<Event, StoreError> {
        let mut events = self.events.write().await;
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound)?;
        update.apply(event);
        Ok(event.clone())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{EventStatus, Role};
    use secrecy::{ExposeSecret, SecretString};
    use std::sync::Arc;

    fn new_principal(username: &str, password: &str, role: Role) -> NewPrincipal {
        NewPrincipal {
            username: username.to_string(),
            password: SecretString::from(password),
            role,
            totp_secret: "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_find_returns_role_and_secret() -> Result<(), StoreError> {
        let store = MemoryCredentialStore::default();
        let created = store
            .create(new_principal("alice", "pw1", Role::Organizer))
            .await?;

        let found = store.find_by_username("alice").await?;
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, Role::Organizer);
        assert_eq!(found.password.expose_secret(), "pw1");
        assert!(found.totp_secret.is_some_and(|s| !s.is_empty()));
        assert!(!found.verified);

        let by_id = store.find_by_id(created.id).await?;
        assert_eq!(by_id.username, "alice");
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_regardless_of_fields() -> Result<(), StoreError> {
        let store = MemoryCredentialStore::default();
        store
            .create(new_principal("alice", "pw1", Role::Organizer))
            .await?;

        let second = store
            .create(new_principal("alice", "other", Role::Admin))
            .await;
        assert!(matches!(second, Err(StoreError::Conflict)));

        // The stored record is untouched.
        let found = store.find_by_username("alice").await?;
        assert_eq!(found.role, Role::Organizer);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_username_is_not_found() {
        let store = MemoryCredentialStore::default();
        assert!(matches!(
            store.find_by_username("nobody").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn concurrent_registrations_admit_exactly_one() {
        let store = Arc::new(MemoryCredentialStore::default());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create(new_principal("race", &format!("pw{i}"), Role::Assistant))
                    .await
                    .is_ok()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap_or(false) {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn events_update_and_list() -> Result<(), StoreError> {
        let store = MemoryEventStore::default();
        let later = store
            .create(NewEvent {
                title: "Closing".to_string(),
                description: None,
                date: Utc::now() + chrono::Duration::days(2),
                location: None,
                capacity: None,
                status: EventStatus::Planning,
            })
            .await?;
        let sooner = store
            .create(NewEvent {
                title: "Opening".to_string(),
                description: None,
                date: Utc::now() + chrono::Duration::days(1),
                location: None,
                capacity: Some(50),
                status: EventStatus::Planning,
            })
            .await?;

        let listed = store.list().await?;
        assert_eq!(listed.first().map(|e| e.id), Some(sooner.id));

        let updated = store
            .update(
                later.id,
                EventUpdate {
                    status: Some(EventStatus::Active),
                    ..EventUpdate::default()
                },
            )
            .await?;
        assert_eq!(updated.status, EventStatus::Active);

        assert!(matches!(
            store.update(Uuid::new_v4(), EventUpdate::default()).await,
            Err(StoreError::NotFound)
        ));
        Ok(())
    }
}
