//! UptimeRobot v2 API client.
//!
//! Every method is a form-encoded `POST <base>/<method>` carrying the account
//! API key; responses are JSON with `stat` set to `ok` or `fail`.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::{fmt, time::Duration};
use url::Url;

use crate::provider::{
    AlertContact, Monitor, MonitorKind, MonitorProvider, NewMonitor, ProviderError,
};
use crate::site::KeywordPolarity;

pub const DEFAULT_API_URL: &str = "https://api.uptimerobot.com/v2/";

const PAGE_LIMIT: u64 = 50;

/// Builds the HTTP client shared by every account client.
///
/// # Errors
///
/// Fails only if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("uptimesync/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[derive(Clone)]
pub struct UptimeRobotClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for UptimeRobotClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UptimeRobotClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl UptimeRobotClient {
    /// `base_url` must end with `/`; method names are appended to it.
    pub fn new(http: Client, base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            api_key: api_key.into(),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let endpoint = format!("{}{method}", self.base_url);
        let mut form = vec![("api_key", self.api_key.clone()), ("format", "json".to_string())];
        form.extend(params.iter().cloned());

        debug!("POST {method}");
        let response = self
            .http
            .post(endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                method: method.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| decode_error(method, e))?;
        match body.get("stat").and_then(Value::as_str) {
            Some("ok") => serde_json::from_value(body).map_err(|e| decode_error(method, e)),
            Some("fail") => Err(ProviderError::Api {
                method: method.to_string(),
                message: api_error_message(&body),
            }),
            _ => Err(decode_error(method, "missing stat field")),
        }
    }
}

fn decode_error(method: &str, reason: impl fmt::Display) -> ProviderError {
    ProviderError::Decode {
        method: method.to_string(),
        reason: reason.to_string(),
    }
}

fn api_error_message(body: &Value) -> String {
    let error = &body["error"];
    error["message"]
        .as_str()
        .or_else(|| error["type"].as_str())
        .map_or_else(|| error.to_string(), ToString::to_string)
}

/// The API is loose about numbers: `port` may be `""`, `null`, `443` or `"443"`.
fn loose_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn loose_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Deserialize)]
struct Pagination {
    #[serde(default)]
    total: Value,
}

#[derive(Deserialize)]
struct MonitorsPage {
    pagination: Option<Pagination>,
    #[serde(default)]
    monitors: Vec<RawMonitor>,
}

#[derive(Deserialize)]
struct RawMonitor {
    id: Value,
    #[serde(default)]
    friendly_name: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "type", default)]
    kind: Value,
    #[serde(default)]
    keyword_type: Value,
    #[serde(default)]
    keyword_value: Option<String>,
    #[serde(default)]
    port: Value,
    #[serde(default)]
    alert_contacts: Vec<RawContactRef>,
}

#[derive(Deserialize)]
struct RawContactRef {
    id: Value,
}

impl RawMonitor {
    fn into_monitor(self) -> Result<Monitor, String> {
        let id =
            loose_u64(&self.id).ok_or_else(|| format!("monitor id {} is not numeric", self.id))?;
        let kind = loose_u64(&self.kind)
            .and_then(|code| u8::try_from(code).ok())
            .map_or(MonitorKind::Other(0), MonitorKind::from_code);
        let keyword_type = loose_u64(&self.keyword_type)
            .and_then(|code| u8::try_from(code).ok())
            .and_then(KeywordPolarity::from_code);
        Ok(Monitor {
            id,
            friendly_name: self.friendly_name,
            url: self.url,
            kind,
            keyword_type,
            keyword_value: self.keyword_value.unwrap_or_default(),
            alert_contacts: self
                .alert_contacts
                .iter()
                .filter_map(|c| loose_string(&c.id))
                .collect(),
            port: loose_u64(&self.port).and_then(|p| u16::try_from(p).ok()),
        })
    }
}

#[derive(Deserialize)]
struct ContactsPage {
    #[serde(default)]
    total: Value,
    #[serde(default)]
    alert_contacts: Vec<RawContact>,
}

#[derive(Deserialize)]
struct RawContact {
    id: Value,
    #[serde(default)]
    friendly_name: String,
    #[serde(rename = "type", default)]
    kind: Value,
}

#[derive(Deserialize)]
struct MonitorRef {
    monitor: RawId,
}

#[derive(Deserialize)]
struct RawId {
    id: Value,
}

#[derive(Deserialize)]
struct AccountDetails {
    account: AccountInfo,
}

#[derive(Deserialize)]
struct AccountInfo {
    #[serde(default)]
    email: String,
}

/// Threshold and recurrence are left at zero: alert immediately, once.
fn alert_contacts_param(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("{id}_0_0"))
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl MonitorProvider for UptimeRobotClient {
    async fn monitors(&self) -> Result<Vec<Monitor>, ProviderError> {
        let mut monitors = Vec::new();
        let mut offset: u64 = 0;
        loop {
            let page: MonitorsPage = self
                .post(
                    "getMonitors",
                    &[
                        ("alert_contacts", "1".to_string()),
                        ("offset", offset.to_string()),
                        ("limit", PAGE_LIMIT.to_string()),
                    ],
                )
                .await?;
            let fetched = page.monitors.len() as u64;
            for raw in page.monitors {
                monitors.push(raw.into_monitor().map_err(|e| decode_error("getMonitors", e))?);
            }
            offset += fetched;
            let total = page
                .pagination
                .and_then(|p| loose_u64(&p.total))
                .unwrap_or(offset);
            if fetched == 0 || offset >= total {
                return Ok(monitors);
            }
        }
    }

    async fn alert_contacts(&self) -> Result<Vec<AlertContact>, ProviderError> {
        let mut contacts = Vec::new();
        let mut offset: u64 = 0;
        loop {
            let page: ContactsPage = self
                .post(
                    "getAlertContacts",
                    &[("offset", offset.to_string()), ("limit", PAGE_LIMIT.to_string())],
                )
                .await?;
            let fetched = page.alert_contacts.len() as u64;
            for raw in page.alert_contacts {
                let id = loose_string(&raw.id)
                    .ok_or_else(|| decode_error("getAlertContacts", "contact without id"))?;
                contacts.push(AlertContact {
                    id,
                    friendly_name: raw.friendly_name,
                    kind: loose_u64(&raw.kind)
                        .and_then(|k| u8::try_from(k).ok())
                        .unwrap_or_default(),
                });
            }
            offset += fetched;
            let total = loose_u64(&page.total).unwrap_or(offset);
            if fetched == 0 || offset >= total {
                return Ok(contacts);
            }
        }
    }

    async fn create_monitor(&self, monitor: &NewMonitor) -> Result<u64, ProviderError> {
        let mut params = vec![
            ("friendly_name", monitor.friendly_name.clone()),
            ("url", monitor.url.clone()),
            ("type", monitor.kind.code().to_string()),
            ("port", monitor.port.to_string()),
        ];
        if let Some(polarity) = monitor.keyword_type {
            params.push(("keyword_type", polarity.code().to_string()));
            params.push(("keyword_value", monitor.keyword_value.clone()));
        }
        if !monitor.alert_contacts.is_empty() {
            params.push(("alert_contacts", alert_contacts_param(&monitor.alert_contacts)));
        }

        let created: MonitorRef = self.post("newMonitor", &params).await?;
        loose_u64(&created.monitor.id)
            .ok_or_else(|| decode_error("newMonitor", "monitor id is not numeric"))
    }

    async fn delete_monitor(&self, id: u64) -> Result<(), ProviderError> {
        let _: MonitorRef = self.post("deleteMonitor", &[("id", id.to_string())]).await?;
        Ok(())
    }

    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<(), ProviderError> {
        let _: Value = self.post(method, params).await?;
        Ok(())
    }

    async fn account_email(&self) -> Result<String, ProviderError> {
        let details: AccountDetails = self.post("getAccountDetails", &[]).await?;
        Ok(details.account.email)
    }
}
