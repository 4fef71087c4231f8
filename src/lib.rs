pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod session;
pub mod transport;
pub mod types;

use std::time::Duration;

pub use client::BiClient;
pub use config::{load_config, BilinkConfig, ClientConfig, Credentials, TenantConfig};
pub use error::BilinkError;
pub use oauth::{OAuthClient, PkceChallenge, TokenSet};
pub use session::{Authenticator, SessionGuard, SessionRegistry};
pub use transport::{TimedTransport, DEFAULT_TIMEOUT};
pub use types::{DailyTotals, Location, RevenueCenter, RevenueCenterTotals};

/// Build the auth and data clients for one tenant over a shared transport.
pub fn connect(
    config: &ClientConfig,
    timeout: Duration,
) -> Result<(OAuthClient, BiClient), BilinkError> {
    let transport = TimedTransport::new(timeout)?;
    let bi = BiClient::new(config, transport.clone());
    Ok((OAuthClient::new(config.clone(), transport), bi))
}
