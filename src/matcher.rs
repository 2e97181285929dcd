//! Identity and equivalence between desired sites and observed monitors.

use log::warn;
use std::collections::BTreeSet;
use url::Url;

use crate::provider::{Monitor, MonitorKind};
use crate::site::{SCHEME_HTTP, SCHEME_HTTPS, Scheme, Website};

/// How an existing monitor has to change to satisfy its site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    None,
    /// Plain <-> keyword. The provider can't change a monitor's type.
    Kind,
    /// Only the keyword text differs.
    Keyword(String),
    /// Scheme, polarity or contacts differ.
    Reconfigure,
}

/// True when `monitor` watches `site_name`, whatever scheme it uses.
#[must_use]
pub fn identity(monitor: &Monitor, site_name: &str) -> bool {
    let url = monitor.url.as_str();
    let host = |scheme: &str| url.strip_prefix(scheme).and_then(|rest| rest.strip_prefix("://"));
    url == site_name
        || host(SCHEME_HTTP) == Some(site_name)
        || host(SCHEME_HTTPS) == Some(site_name)
}

/// A monitor is an orphan when no site claims it.
#[must_use]
pub fn should_delete(monitor: &Monitor, sites: &[Website]) -> bool {
    !sites.iter().any(|site| identity(monitor, &site.name))
}

/// First observed monitor matching the site.
#[must_use]
pub fn find_monitor<'a>(monitors: &'a [Monitor], site_name: &str) -> Option<&'a Monitor> {
    monitors.iter().find(|m| identity(m, site_name))
}

/// Numeric contact set; IDs that aren't numbers are dropped.
#[must_use]
pub fn contact_set(ids: &[String]) -> BTreeSet<u64> {
    ids.iter()
        .filter_map(|id| match id.trim().parse() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("Ignoring non-numeric alert contact id {id:?}");
                None
            }
        })
        .collect()
}

fn monitor_scheme(monitor: &Monitor) -> Option<Scheme> {
    match Url::parse(&monitor.url).ok()?.scheme() {
        SCHEME_HTTP => Some(Scheme::Http),
        SCHEME_HTTPS => Some(Scheme::Https),
        _ => None,
    }
}

/// `contacts` are the site's labels already resolved against the account
/// holding `monitor`.
#[must_use]
pub fn equivalent(monitor: &Monitor, site: &Website, contacts: &[String]) -> bool {
    let polarity_matches = match site.polarity() {
        Some(polarity) => monitor.keyword_type == Some(polarity),
        None => true,
    };
    contact_set(contacts) == contact_set(&monitor.alert_contacts)
        && polarity_matches
        && monitor_scheme(monitor) == Some(site.scheme())
        && monitor.keyword_value == site.config.keyword
}

fn kind_differs(monitor: &Monitor, site: &Website) -> bool {
    match monitor.kind {
        MonitorKind::Plain => site.has_keyword(),
        MonitorKind::Keyword => !site.has_keyword(),
        MonitorKind::Other(_) => true,
    }
}

/// Kind change wins over a keyword edit, which wins over a full reconfigure.
#[must_use]
pub fn plan_change(monitor: &Monitor, site: &Website, contacts: &[String]) -> Change {
    if equivalent(monitor, site, contacts) {
        return Change::None;
    }
    if kind_differs(monitor, site) {
        return Change::Kind;
    }
    let only_keyword_differs = {
        let mut edited = monitor.clone();
        edited.keyword_value.clone_from(&site.config.keyword);
        equivalent(&edited, site, contacts)
    };
    if only_keyword_differs {
        Change::Keyword(site.config.keyword.clone())
    } else {
        Change::Reconfigure
    }
}
