use super::{
    handlers::{
        demo, events, health, me, refresh, register, registrations, verify_totp, Message,
    },
    Service,
};
use crate::{
    error::ErrorBody,
    store::{Event, EventStatus, EventUpdate, NewEvent, Role},
    token::{Claims, Identity},
};
use utoipa::{
    openapi::{
        security::{Http, HttpAuthScheme, SecurityScheme},
        Contact, InfoBuilder, License,
    },
    Modify, OpenApi,
};

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "basic",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
        );
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        register::register,
        verify_totp::verify_totp,
        refresh::refresh,
        me::me,
        demo::schedule,
        demo::enroll,
        demo::create_event,
        demo::update_agenda,
        demo::my_talk,
        demo::admin_dashboard,
    ),
    components(schemas(ErrorBody, Message, Claims, Identity, Role)),
    modifiers(&SecuritySchemes),
    tags(
        (name = "auth", description = "Registration, TOTP verification and token refresh"),
        (name = "gated", description = "Routes restricted to role allow-lists"),
        (name = "health", description = "Liveness and database status"),
    )
)]
struct AuthApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        events::create,
        events::list,
        events::update,
        events::admin_dashboard,
    ),
    components(schemas(ErrorBody, Message, Event, EventStatus, NewEvent, EventUpdate)),
    modifiers(&SecuritySchemes),
    tags(
        (name = "events", description = "Event records"),
        (name = "health", description = "Liveness and database status"),
    )
)]
struct EventsApi;

#[derive(OpenApi)]
#[openapi(
    paths(health::health, registrations::register, registrations::list),
    components(schemas(ErrorBody, Message)),
    modifiers(&SecuritySchemes),
    tags(
        (name = "registrations", description = "Event registrations"),
        (name = "health", description = "Liveness"),
    )
)]
struct RegistrationsApi;

/// `OpenAPI` document for `service`, with info taken from Cargo metadata.
#[must_use]
pub fn openapi(service: Service) -> utoipa::openapi::OpenApi {
    let mut doc = match service {
        Service::Auth => AuthApi::openapi(),
        Service::Events => EventsApi::openapi(),
        Service::Registrations => RegistrationsApi::openapi(),
    };

    let mut info = InfoBuilder::new()
        .title(format!("{} {}", env!("CARGO_PKG_NAME"), service.name()))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;

    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    let Some(start) = author.find('<') else {
        let name = author.trim();
        return (if name.is_empty() { None } else { Some(name) }, None);
    };

    let name = author[..start].trim();
    let email = author[start + 1..].trim_end_matches('>').trim();
    (
        (!name.is_empty()).then_some(name),
        (!email.is_empty()).then_some(email),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi(Service::Auth);
        assert_eq!(doc.info.title, "eventgate auth");
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact.unwrap_or_default();
        assert_eq!(contact.name.as_deref(), Some("Team Eventgate"));
        assert_eq!(contact.email.as_deref(), Some("team@eventgate.dev"));
    }

    #[test]
    fn each_service_documents_its_routes() {
        let auth = openapi(Service::Auth);
        for path in ["/register", "/verify-totp", "/refresh", "/me", "/admin-dashboard"] {
            assert!(auth.paths.paths.contains_key(path), "auth is missing {path}");
        }

        let events = openapi(Service::Events);
        assert!(events.paths.paths.contains_key("/events"));
        assert!(events.paths.paths.contains_key("/events/{id}"));
        assert!(!events.paths.paths.contains_key("/register"));

        let registrations = openapi(Service::Registrations);
        assert!(registrations.paths.paths.contains_key("/registrations"));
    }

    #[test]
    fn security_schemes_are_registered() {
        let doc = openapi(Service::Events);
        let components = doc.components.unwrap_or_default();
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(components.security_schemes.contains_key("basic"));
    }

    #[test]
    fn test_parse_author() {
        assert_eq!(
            parse_author("Team Eventgate <team@eventgate.dev>"),
            (Some("Team Eventgate"), Some("team@eventgate.dev"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
        assert_eq!(parse_author("<a@b.c>"), (None, Some("a@b.c")));
    }
}
