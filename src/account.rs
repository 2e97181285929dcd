//! Provider accounts and the monitor operations scoped to one account.

use log::{error, info, warn};
use std::sync::Arc;

use crate::config::AccountCredentials;
use crate::error::Error;
use crate::provider::{
    AlertContact, Monitor, MonitorKind, MonitorProvider, NewMonitor, ProviderError,
};
use crate::site::Website;

/// Monitors a single account may hold.
pub const MONITOR_LIMIT: usize = 50;

/// An account with its client bound for the current run.
#[derive(Clone)]
pub struct Account {
    email: String,
    client: Arc<dyn MonitorProvider>,
}

/// Where a new monitor ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub id: u64,
    pub account: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// The account no longer holds the monitor; nothing was sent.
    AlreadyGone,
}

/// Binds one client per configured account, preserving declaration order.
///
/// # Errors
///
/// Propagates the first error returned by `connect`.
pub fn bind_accounts<F>(
    credentials: &[AccountCredentials],
    mut connect: F,
) -> Result<Vec<Account>, Error>
where
    F: FnMut(&AccountCredentials) -> Result<Arc<dyn MonitorProvider>, Error>,
{
    credentials
        .iter()
        .map(|creds| Ok(Account::new(creds.email.clone(), connect(creds)?)))
        .collect()
}

impl Account {
    pub fn new(email: impl Into<String>, client: Arc<dyn MonitorProvider>) -> Self {
        Self {
            email: email.into(),
            client,
        }
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Fresh listing of every monitor the account holds.
    ///
    /// # Errors
    ///
    /// Any provider failure.
    pub async fn list_monitors(&self) -> Result<Vec<Monitor>, ProviderError> {
        self.client.monitors().await
    }

    /// A failed probe counts as "full" so nothing is created blind.
    pub async fn has_free_capacity(&self) -> bool {
        match self.list_monitors().await {
            Ok(monitors) => monitors.len() < MONITOR_LIMIT,
            Err(e) => {
                error!("Can't check capacity of account {}: {e}", self.email);
                false
            }
        }
    }

    /// # Errors
    ///
    /// Any provider failure.
    pub async fn list_contacts(&self) -> Result<Vec<AlertContact>, ProviderError> {
        self.client.alert_contacts().await
    }

    /// Maps the site's contact labels to this account's contact IDs, in label
    /// order. Unknown labels are skipped with a warning.
    ///
    /// # Errors
    ///
    /// The contact list couldn't be fetched.
    pub async fn resolve_contact_ids(
        &self,
        site: &Website,
    ) -> Result<Vec<String>, ProviderError> {
        if site.config.contact.is_empty() {
            return Ok(Vec::new());
        }
        let contacts = self.list_contacts().await?;
        Ok(resolve_labels(site, &contacts, &self.email))
    }

    /// Creates the monitor described by `site` in this account. If the contact
    /// list can't be fetched the monitor is created without alert contacts; the
    /// next run attaches them.
    ///
    /// # Errors
    ///
    /// The create call failed; the site stays unmonitored until the next run.
    pub async fn create_monitor(&self, site: &Website) -> Result<Placement, ProviderError> {
        let alert_contacts = match self.resolve_contact_ids(site).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(
                    "Can't get alert contacts of account {}, creating {} without them: {e}",
                    self.email, site.name
                );
                Vec::new()
            }
        };
        let request = NewMonitor {
            friendly_name: site.name.clone(),
            url: site.url(),
            kind: if site.has_keyword() {
                MonitorKind::Keyword
            } else {
                MonitorKind::Plain
            },
            keyword_type: site.polarity(),
            keyword_value: site.config.keyword.clone(),
            port: site.port(),
            alert_contacts,
        };
        let id = self.client.create_monitor(&request).await?;

        let account = match self.client.account_email().await {
            Ok(email) if !email.is_empty() => email,
            Ok(_) => self.email.clone(),
            Err(e) => {
                warn!("Can't fetch account details for {}: {e}", self.email);
                self.email.clone()
            }
        };
        Ok(Placement { id, account })
    }

    /// Deletes `id` if a fresh listing confirms this account still holds it.
    ///
    /// # Errors
    ///
    /// The confirming listing or the delete call failed.
    pub async fn delete_monitor(&self, id: u64) -> Result<Removal, ProviderError> {
        let held = self.list_monitors().await?.iter().any(|m| m.id == id);
        if !held {
            info!("Monitor {id} is no longer in account {}, skipping delete", self.email);
            return Ok(Removal::AlreadyGone);
        }
        self.client.delete_monitor(id).await?;
        Ok(Removal::Deleted)
    }

    /// Replaces only the keyword text of an existing keyword monitor.
    ///
    /// # Errors
    ///
    /// The edit call failed.
    pub async fn edit_keyword(&self, id: u64, keyword: &str) -> Result<(), ProviderError> {
        self.client
            .call(
                "editMonitor",
                &[("id", id.to_string()), ("keyword_value", keyword.to_string())],
            )
            .await
    }
}

fn resolve_labels(site: &Website, contacts: &[AlertContact], account: &str) -> Vec<String> {
    site.config
        .contact
        .iter()
        .filter_map(|label| {
            let found = contacts.iter().find(|c| &c.friendly_name == label);
            if found.is_none() {
                warn!(
                    "Alert contact {label:?} for {} not found in account {account}",
                    site.name
                );
            }
            found.map(|c| c.id.clone())
        })
        .collect()
}
