//! Keeps the monitors of one or more UptimeRobot accounts in line with a
//! declared sitelist.

pub mod account;
pub mod config;
pub mod error;
pub mod matcher;
pub mod provider;
pub mod reconciler;
pub mod site;
pub mod uptimerobot;

use log::info;
use std::sync::Arc;

pub use account::{Account, MONITOR_LIMIT, Placement, bind_accounts};
pub use config::{AccountCredentials, Config};
pub use error::Error;
pub use provider::{
    AlertContact, Monitor, MonitorKind, MonitorProvider, NewMonitor, ProviderError,
};
pub use reconciler::{
    CreateOutcome, Deletion, DeletionOutcome, Reconciler, ReplaceReason, Report, SiteOutcome,
    SiteReport,
};
pub use site::{KeywordPolarity, Scheme, Sitelist, Website};
pub use uptimerobot::UptimeRobotClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reconcile,
    /// Delete every monitor of every account.
    Purge,
}

/// Binds an UptimeRobot client to each configured account.
///
/// # Errors
///
/// The HTTP client can't be built or the API URL is invalid.
pub fn connect_accounts(config: &Config) -> Result<Vec<Account>, Error> {
    let http = uptimerobot::build_http_client(config.timeout())?;
    let base_url = config.api_url()?;
    bind_accounts(&config.accounts, |creds| {
        let client: Arc<dyn MonitorProvider> = Arc::new(UptimeRobotClient::new(
            http.clone(),
            base_url.clone(),
            creds.token.clone(),
        ));
        Ok(client)
    })
}

/// Loads configuration and desired state, then runs `command`.
///
/// # Errors
///
/// Configuration or sitelist problems. These surface before any provider call;
/// provider failures are reported inside the returned [`Report`] instead.
pub async fn run(command: Command) -> Result<Report, Error> {
    let config = Config::load()?;
    info!("Loaded {} accounts", config.accounts.len());

    match command {
        Command::Reconcile => {
            let sitelist = Sitelist::load(&config.config.sitelist_path)?;
            info!(
                "Loaded {} websites from {}",
                sitelist.len(),
                config.config.sitelist_path.display()
            );
            let reconciler = Reconciler::new(connect_accounts(&config)?);
            Ok(reconciler.run(&sitelist).await)
        }
        Command::Purge => {
            let reconciler = Reconciler::new(connect_accounts(&config)?);
            Ok(reconciler.purge().await)
        }
    }
}
