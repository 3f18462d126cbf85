//! pms: remote store client, sync controller, session handling and the HTTP
//! persistence backend. Domain types, derivations and the state store live in
//! [`pms_core`].

pub mod api;
pub mod client;
pub mod config;
pub mod session;
pub mod sync;

pub use client::{ApiClient, NetworkError};
pub use config::Config;
pub use session::SessionFile;
pub use sync::{SyncController, SyncError};

/// Build a sync controller from a loaded configuration.
pub fn controller_from_config(config: &Config) -> anyhow::Result<SyncController> {
    let profile = config.endpoint_profile()?;
    let client = ApiClient::new(&config.base_url, profile, config.request_timeout())?;
    Ok(SyncController::new(client))
}
