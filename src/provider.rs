//! Observed state and the interface to the monitoring provider.

use async_trait::async_trait;
use thiserror::Error;

use crate::site::KeywordPolarity;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{method} request failed: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} returned HTTP {status}")]
    Status { method: String, status: u16 },
    #[error("{method} was rejected: {message}")]
    Api { method: String, message: String },
    #[error("malformed {method} response: {reason}")]
    Decode { method: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
    /// HTTP(s) status check.
    Plain,
    Keyword,
    /// Ping, port and heartbeat monitors. Never produced by this tool.
    Other(u8),
}

impl MonitorKind {
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Plain,
            2 => Self::Keyword,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Plain => 1,
            Self::Keyword => 2,
            Self::Other(code) => code,
        }
    }
}

impl KeywordPolarity {
    /// The provider phrases polarity as the alert condition, so "page must
    /// contain the keyword" is sent as "alert when not exists" (2).
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Exists => 2,
            Self::NotExists => 1,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(Self::Exists),
            1 => Some(Self::NotExists),
            _ => None,
        }
    }
}

/// A monitor as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub id: u64,
    pub friendly_name: String,
    pub url: String,
    pub kind: MonitorKind,
    pub keyword_type: Option<KeywordPolarity>,
    pub keyword_value: String,
    pub alert_contacts: Vec<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContact {
    pub id: String,
    pub friendly_name: String,
    pub kind: u8,
}

/// Parameters of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMonitor {
    pub friendly_name: String,
    pub url: String,
    pub kind: MonitorKind,
    pub keyword_type: Option<KeywordPolarity>,
    pub keyword_value: String,
    pub port: u16,
    pub alert_contacts: Vec<String>,
}

/// Operations the reconciler needs from one provider account.
#[async_trait]
pub trait MonitorProvider: Send + Sync {
    async fn monitors(&self) -> Result<Vec<Monitor>, ProviderError>;

    async fn alert_contacts(&self) -> Result<Vec<AlertContact>, ProviderError>;

    /// Returns the provider-assigned monitor ID.
    async fn create_monitor(&self, monitor: &NewMonitor) -> Result<u64, ProviderError>;

    async fn delete_monitor(&self, id: u64) -> Result<(), ProviderError>;

    /// Low-level call for API methods without a typed wrapper.
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<(), ProviderError>;

    async fn account_email(&self) -> Result<String, ProviderError>;
}
