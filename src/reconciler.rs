use futures::future::join_all;
use log::{error, info, warn};
use std::{collections::HashMap, fmt};

use crate::account::{Account, Placement, Removal};
use crate::matcher::{Change, find_monitor, plan_change, should_delete};
use crate::provider::Monitor;
use crate::site::{Sitelist, Website};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    AlreadyGone,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub id: u64,
    pub name: String,
    pub account: String,
    pub outcome: DeletionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Placement),
    /// Every reachable account is at its monitor limit.
    SkippedNoCapacity,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceReason {
    KindChanged,
    Reconfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteOutcome {
    Unchanged { id: u64 },
    New(CreateOutcome),
    Replaced {
        old_id: u64,
        reason: ReplaceReason,
        then: CreateOutcome,
    },
    KeywordEdited { id: u64, keyword: String },
    /// The old monitor couldn't be removed, so no replacement was created.
    DeleteFailed { id: u64, reason: String },
    EditFailed { id: u64, reason: String },
    /// The owning account's contacts couldn't be read, so the monitor was left
    /// as is.
    ContactsUnavailable { id: u64, reason: String },
    /// The site may exist on an account whose listing failed this run.
    SkippedAccountUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteReport {
    pub name: String,
    pub outcome: SiteOutcome,
}

/// Everything one pass did, in the order it happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub deletions: Vec<Deletion>,
    pub sites: Vec<SiteReport>,
}

impl Report {
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&SiteOutcome> {
        self.sites.iter().find(|s| s.name == name).map(|s| &s.outcome)
    }

    /// Provider-side changes that were applied.
    #[must_use]
    pub fn mutations(&self) -> usize {
        let created =
            |outcome: &CreateOutcome| usize::from(matches!(outcome, CreateOutcome::Created(_)));
        let deleted = self
            .deletions
            .iter()
            .filter(|d| d.outcome == DeletionOutcome::Deleted)
            .count();
        let per_site: usize = self
            .sites
            .iter()
            .map(|s| match &s.outcome {
                SiteOutcome::New(then) => created(then),
                SiteOutcome::Replaced { then, .. } => 1 + created(then),
                SiteOutcome::KeywordEdited { .. } => 1,
                _ => 0,
            })
            .sum();
        deleted + per_site
    }
}

#[derive(Default)]
struct Tally {
    created: usize,
    replaced: usize,
    edited: usize,
    unchanged: usize,
    skipped: usize,
    failed: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tally = Tally::default();
        for site in &self.sites {
            let slot = match &site.outcome {
                SiteOutcome::Unchanged { .. } => &mut tally.unchanged,
                SiteOutcome::New(CreateOutcome::Created(_)) => &mut tally.created,
                SiteOutcome::Replaced { .. } => &mut tally.replaced,
                SiteOutcome::KeywordEdited { .. } => &mut tally.edited,
                SiteOutcome::New(CreateOutcome::SkippedNoCapacity)
                | SiteOutcome::SkippedAccountUnavailable => &mut tally.skipped,
                SiteOutcome::New(CreateOutcome::Failed(_))
                | SiteOutcome::DeleteFailed { .. }
                | SiteOutcome::EditFailed { .. }
                | SiteOutcome::ContactsUnavailable { .. } => &mut tally.failed,
            };
            *slot += 1;
        }
        let deleted = self
            .deletions
            .iter()
            .filter(|d| d.outcome == DeletionOutcome::Deleted)
            .count();
        write!(
            f,
            "{deleted} deleted, {} created, {} replaced, {} edited, {} unchanged, {} skipped, \
             {} failed",
            tally.created,
            tally.replaced,
            tally.edited,
            tally.unchanged,
            tally.skipped,
            tally.failed,
        )
    }
}

/// Live monitors of every reachable account, with an index from monitor ID to
/// the account holding it.
struct Observed {
    monitors: Vec<Monitor>,
    owners: HashMap<u64, usize>,
    unavailable: Vec<usize>,
}

impl Observed {
    fn is_available(&self, account: usize) -> bool {
        !self.unavailable.contains(&account)
    }
}

pub struct Reconciler {
    accounts: Vec<Account>,
}

impl Reconciler {
    /// `accounts` are tried in order when a new monitor needs a home.
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// Runs one full reconciliation pass.
    ///
    /// # Behavior
    ///
    /// - Lists the monitors of every account (concurrently, read-only)
    /// - Deletes each monitor no site claims
    /// - Walks the sites in order: creates missing monitors in the first
    ///   account with room, edits keyword-only changes in place and replaces
    ///   monitors whose type, scheme, polarity or contacts drifted
    /// - Never retries; a failed step is reported and left for the next run
    pub async fn run(&self, sitelist: &Sitelist) -> Report {
        let sites = sitelist.sites();
        info!(
            "Reconciling {} websites across {} accounts",
            sites.len(),
            self.accounts.len()
        );
        let observed = self.observe().await;
        let mut report = Report::default();

        for monitor in &observed.monitors {
            if should_delete(monitor, sites) {
                if let Some(deletion) = self.remove(&observed, monitor).await {
                    report.deletions.push(deletion);
                }
            }
        }

        for site in sites {
            let outcome = self.reconcile_site(site, &observed).await;
            report.sites.push(SiteReport {
                name: site.name.clone(),
                outcome,
            });
        }

        info!("Reconciliation finished: {report}");
        report
    }

    /// Deletes every monitor on every reachable account.
    pub async fn purge(&self) -> Report {
        let observed = self.observe().await;
        let mut report = Report::default();
        for monitor in &observed.monitors {
            if let Some(deletion) = self.remove(&observed, monitor).await {
                report.deletions.push(deletion);
            }
        }
        info!("Purge finished: {report}");
        report
    }

    async fn observe(&self) -> Observed {
        let listings =
            join_all(self.accounts.iter().map(|account| account.list_monitors())).await;

        let mut observed = Observed {
            monitors: Vec::new(),
            owners: HashMap::new(),
            unavailable: Vec::new(),
        };
        for (index, listing) in listings.into_iter().enumerate() {
            match listing {
                Ok(monitors) => {
                    for monitor in monitors {
                        observed.owners.entry(monitor.id).or_insert(index);
                        observed.monitors.push(monitor);
                    }
                }
                Err(e) => {
                    error!(
                        "Can't get monitors for account {}, leaving it untouched this run: {e}",
                        self.accounts[index].email()
                    );
                    observed.unavailable.push(index);
                }
            }
        }
        observed
    }

    fn owner(&self, observed: &Observed, id: u64) -> Option<&Account> {
        observed.owners.get(&id).map(|&index| &self.accounts[index])
    }

    async fn remove(&self, observed: &Observed, monitor: &Monitor) -> Option<Deletion> {
        let account = self.owner(observed, monitor.id)?;
        let outcome = match account.delete_monitor(monitor.id).await {
            Ok(Removal::Deleted) => {
                info!(
                    "Deleted monitor {} (ID {}) from account {}",
                    monitor.friendly_name,
                    monitor.id,
                    account.email()
                );
                DeletionOutcome::Deleted
            }
            Ok(Removal::AlreadyGone) => DeletionOutcome::AlreadyGone,
            Err(e) => {
                error!(
                    "Can't delete monitor {} (ID {}): {e}",
                    monitor.friendly_name, monitor.id
                );
                DeletionOutcome::Failed(e.to_string())
            }
        };
        Some(Deletion {
            id: monitor.id,
            name: monitor.friendly_name.clone(),
            account: account.email().to_string(),
            outcome,
        })
    }

    async fn reconcile_site(&self, site: &Website, observed: &Observed) -> SiteOutcome {
        let existing = find_monitor(&observed.monitors, &site.name)
            .and_then(|monitor| Some((monitor, self.owner(observed, monitor.id)?)));
        let Some((monitor, owner)) = existing else {
            if !observed.unavailable.is_empty() {
                warn!(
                    "Not creating monitor for {}: an account could not be listed this run",
                    site.name
                );
                return SiteOutcome::SkippedAccountUnavailable;
            }
            return SiteOutcome::New(self.create(site, observed).await);
        };

        let contacts = match owner.resolve_contact_ids(site).await {
            Ok(contacts) => contacts,
            Err(e) => {
                error!(
                    "Can't get alert contacts of account {}, leaving monitor {} as is: {e}",
                    owner.email(),
                    site.name
                );
                return SiteOutcome::ContactsUnavailable {
                    id: monitor.id,
                    reason: e.to_string(),
                };
            }
        };
        match plan_change(monitor, site, &contacts) {
            Change::None => {
                info!("Monitor {} (ID {}) is up to date", site.name, monitor.id);
                SiteOutcome::Unchanged { id: monitor.id }
            }
            Change::Keyword(keyword) => match owner.edit_keyword(monitor.id, &keyword).await {
                Ok(()) => {
                    info!(
                        "Changed monitor {} keyword from {:?} to {keyword:?} in account {}",
                        site.name,
                        monitor.keyword_value,
                        owner.email()
                    );
                    SiteOutcome::KeywordEdited {
                        id: monitor.id,
                        keyword,
                    }
                }
                Err(e) => {
                    error!("Can't change keyword of monitor {}: {e}", site.name);
                    SiteOutcome::EditFailed {
                        id: monitor.id,
                        reason: e.to_string(),
                    }
                }
            },
            Change::Kind => {
                self.replace(site, monitor, owner, ReplaceReason::KindChanged, observed)
                    .await
            }
            Change::Reconfigure => {
                self.replace(site, monitor, owner, ReplaceReason::Reconfigured, observed)
                    .await
            }
        }
    }

    async fn replace(
        &self,
        site: &Website,
        monitor: &Monitor,
        owner: &Account,
        reason: ReplaceReason,
        observed: &Observed,
    ) -> SiteOutcome {
        match owner.delete_monitor(monitor.id).await {
            Ok(_) => info!(
                "Deleted monitor {} (ID {}) from account {} to recreate it ({reason:?})",
                site.name,
                monitor.id,
                owner.email()
            ),
            Err(e) => {
                error!(
                    "Can't delete monitor {} (ID {}) for recreation: {e}",
                    site.name, monitor.id
                );
                return SiteOutcome::DeleteFailed {
                    id: monitor.id,
                    reason: e.to_string(),
                };
            }
        }
        SiteOutcome::Replaced {
            old_id: monitor.id,
            reason,
            then: self.create(site, observed).await,
        }
    }

    /// First-fit: the first reachable account with room gets the monitor.
    async fn create(&self, site: &Website, observed: &Observed) -> CreateOutcome {
        for (index, account) in self.accounts.iter().enumerate() {
            if !observed.is_available(index) || !account.has_free_capacity().await {
                continue;
            }
            return match account.create_monitor(site).await {
                Ok(placement) => {
                    info!(
                        "Created monitor {} in account {} with ID {}",
                        site.name, placement.account, placement.id
                    );
                    CreateOutcome::Created(placement)
                }
                Err(e) => {
                    error!(
                        "Can't create monitor {} in account {}: {e}",
                        site.name,
                        account.email()
                    );
                    CreateOutcome::Failed(e.to_string())
                }
            };
        }
        warn!("No account has free capacity, {} stays unmonitored", site.name);
        CreateOutcome::SkippedNoCapacity
    }
}
