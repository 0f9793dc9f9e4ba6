use anyhow::{anyhow, Result};
use eventgate::api::{openapi, Service};

// Print the OpenAPI document of one service (default: auth).
fn main() -> Result<()> {
    let service = match std::env::args().nth(1).as_deref() {
        None | Some("auth") => Service::Auth,
        Some("events") => Service::Events,
        Some("registrations") => Service::Registrations,
        Some(other) => return Err(anyhow!("unknown service: {other}")),
    };

    let json = serde_json::to_string_pretty(&openapi(service))?;
    println!("{json}");
    Ok(())
}
