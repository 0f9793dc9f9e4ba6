//! Maps validated CLI matches to the service action to run.

use crate::api::{HttpOptions, Service};
use crate::cli::actions::{
    server::{AuthArgs, EventsArgs, RegistrationsArgs},
    Action,
};
use crate::cli::commands::{
    ARG_ACCESS_SECRET, ARG_CORS_ORIGIN, ARG_DSN, ARG_PORT, ARG_REFRESH_ROLE_FROM_STORE,
    ARG_REFRESH_SECRET, ARG_TOTP_ISSUER,
};
use crate::token::TokenKeys;
use crate::totp::TotpConfig;
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or the token secrets are unusable.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("auth", sub)) => {
            let keys = TokenKeys::new(
                secret(sub, ARG_ACCESS_SECRET)?,
                secret(sub, ARG_REFRESH_SECRET)?,
            )
            .context("invalid token secrets")?;

            let totp = TotpConfig::new(required(sub, ARG_TOTP_ISSUER)?);
            totp.validate().context("invalid TOTP issuer")?;

            Ok(Action::Auth(AuthArgs {
                port: port(sub, Service::Auth),
                dsn: required(sub, ARG_DSN)?,
                keys,
                totp,
                refresh_role_from_store: sub.get_flag(ARG_REFRESH_ROLE_FROM_STORE),
                http: http(sub),
            }))
        }
        Some(("events", sub)) => Ok(Action::Events(EventsArgs {
            port: port(sub, Service::Events),
            dsn: required(sub, ARG_DSN)?,
            access_secret: secret(sub, ARG_ACCESS_SECRET)?,
            http: http(sub),
        })),
        Some(("registrations", sub)) => Ok(Action::Registrations(RegistrationsArgs {
            port: port(sub, Service::Registrations),
            access_secret: secret(sub, ARG_ACCESS_SECRET)?,
            http: http(sub),
        })),
        Some((other, _)) => Err(anyhow!("unknown service: {other}")),
        None => Err(anyhow!("missing service subcommand")),
    }
}

fn port(matches: &ArgMatches, service: Service) -> u16 {
    matches
        .get_one::<u16>(ARG_PORT)
        .copied()
        .unwrap_or(service.default_port())
}

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

fn secret(matches: &ArgMatches, name: &str) -> Result<SecretString> {
    required(matches, name).map(SecretString::from)
}

fn http(matches: &ArgMatches) -> HttpOptions {
    HttpOptions {
        cors_origin: matches.get_one::<String>(ARG_CORS_ORIGIN).cloned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const UNSET: [&str; 7] = [
        "EVENTGATE_PORT",
        "EVENTGATE_DSN",
        "EVENTGATE_ACCESS_SECRET",
        "EVENTGATE_REFRESH_SECRET",
        "EVENTGATE_CORS_ORIGIN",
        "EVENTGATE_REFRESH_ROLE_FROM_STORE",
        "EVENTGATE_TOTP_ISSUER",
    ];

    fn parse(args: &[&str]) -> Result<Action> {
        let matches = crate::cli::commands::new().get_matches_from(args.iter().copied());
        handler(&matches)
    }

    #[test]
    fn auth_action() {
        temp_env::with_vars_unset(UNSET, || {
            let action = parse(&[
                "eventgate",
                "auth",
                "--dsn",
                "memory://",
                "--access-secret",
                "access",
                "--refresh-secret",
                "refresh",
                "--refresh-role-from-store",
                "--port",
                "9000",
            ])
            .unwrap();

            let Action::Auth(args) = action else {
                panic!("expected auth action");
            };
            assert_eq!(args.port, 9000);
            assert_eq!(args.dsn, "memory://");
            assert_eq!(args.keys.access.expose_secret(), "access");
            assert_eq!(args.keys.refresh.expose_secret(), "refresh");
            assert!(args.refresh_role_from_store);
            assert_eq!(args.totp.issuer, "AuthApp");
            assert_eq!(args.http.cors_origin, None);
        });
    }

    #[test]
    fn equal_secrets_are_rejected() {
        temp_env::with_vars_unset(UNSET, || {
            let err = parse(&[
                "eventgate",
                "auth",
                "--dsn",
                "memory://",
                "--access-secret",
                "same",
                "--refresh-secret",
                "same",
            ])
            .unwrap_err();
            assert!(err.to_string().contains("invalid token secrets"));
        });
    }

    #[test]
    fn issuer_with_colon_fails_at_startup() {
        temp_env::with_vars(
            [
                ("EVENTGATE_TOTP_ISSUER", Some("Acme:Corp")),
                ("EVENTGATE_DSN", Some("memory://")),
                ("EVENTGATE_ACCESS_SECRET", Some("access")),
                ("EVENTGATE_REFRESH_SECRET", Some("refresh")),
                ("EVENTGATE_PORT", None),
                ("EVENTGATE_CORS_ORIGIN", None),
                ("EVENTGATE_REFRESH_ROLE_FROM_STORE", None),
            ],
            || {
                let err = parse(&["eventgate", "auth"]).unwrap_err();
                assert!(err.to_string().contains("invalid TOTP issuer"));
            },
        );
    }

    #[test]
    fn events_and_registrations_actions() {
        temp_env::with_vars(
            [
                ("EVENTGATE_ACCESS_SECRET", Some("access")),
                ("EVENTGATE_CORS_ORIGIN", Some("https://app.example.com")),
                ("EVENTGATE_DSN", Some("memory://")),
                ("EVENTGATE_PORT", None),
            ],
            || {
                let Action::Events(args) = parse(&["eventgate", "events"]).unwrap() else {
                    panic!("expected events action");
                };
                assert_eq!(args.port, 4001);
                assert_eq!(args.access_secret.expose_secret(), "access");
                assert_eq!(
                    args.http.cors_origin.as_deref(),
                    Some("https://app.example.com")
                );

                let Action::Registrations(args) =
                    parse(&["eventgate", "registrations"]).unwrap()
                else {
                    panic!("expected registrations action");
                };
                assert_eq!(args.port, 4002);
            },
        );
    }
}
