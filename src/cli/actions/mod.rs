pub mod server;

use anyhow::Result;

#[derive(Debug)]
pub enum Action {
    Auth(server::AuthArgs),
    Events(server::EventsArgs),
    Registrations(server::RegistrationsArgs),
}

impl Action {
    /// Run the selected service until shutdown.
    ///
    /// # Errors
    /// Returns an error if the service fails to start or stops abnormally.
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Auth(args) => server::auth(args).await,
            Self::Events(args) => server::events(args).await,
            Self::Registrations(args) => server::registrations(args).await,
        }
    }
}
