pub mod logging;

use crate::api::Service;
use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_ACCESS_SECRET: &str = "access-secret";
pub const ARG_REFRESH_SECRET: &str = "refresh-secret";
pub const ARG_TOTP_ISSUER: &str = "totp-issuer";
pub const ARG_REFRESH_ROLE_FROM_STORE: &str = "refresh-role-from-store";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("eventgate")
        .about("Registration, two-factor login and role-gated event services")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(auth())
        .subcommand(events())
        .subcommand(registrations());

    logging::with_args(command)
}

fn auth() -> Command {
    service(Service::Auth, "Registration, TOTP verification and token issuance")
        .arg(dsn())
        .arg(
            Arg::new(ARG_REFRESH_SECRET)
                .long("refresh-secret")
                .help("HMAC secret for refresh tokens, must differ from the access secret")
                .env("EVENTGATE_REFRESH_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOTP_ISSUER)
                .long("totp-issuer")
                .help("Issuer shown in authenticator apps")
                .env("EVENTGATE_TOTP_ISSUER")
                .default_value("AuthApp"),
        )
        .arg(
            Arg::new(ARG_REFRESH_ROLE_FROM_STORE)
                .long("refresh-role-from-store")
                .help("Re-read the role from the store when refreshing an access token")
                .env("EVENTGATE_REFRESH_ROLE_FROM_STORE")
                .action(ArgAction::SetTrue),
        )
}

fn events() -> Command {
    service(Service::Events, "Event records behind role allow-lists").arg(dsn())
}

fn registrations() -> Command {
    service(
        Service::Registrations,
        "Event registrations behind role allow-lists",
    )
}

/// Arguments every service takes.
fn service(service: Service, about: &'static str) -> Command {
    Command::new(service.name())
        .about(about)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value(default_port(service))
                .env("EVENTGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_ACCESS_SECRET)
                .long("access-secret")
                .help("HMAC secret for access tokens, shared by all services")
                .env("EVENTGATE_ACCESS_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long("cors-origin")
                .help("Allowed CORS origin, example: https://app.example.com (default: any)")
                .env("EVENTGATE_CORS_ORIGIN"),
        )
}

const fn default_port(service: Service) -> &'static str {
    match service {
        Service::Auth => "4000",
        Service::Events => "4001",
        Service::Registrations => "4002",
    }
}

fn dsn() -> Arg {
    Arg::new(ARG_DSN)
        .short('d')
        .long("dsn")
        .help("Database connection string, or memory:// for in-process stores")
        .env("EVENTGATE_DSN")
        .required(true)
}
