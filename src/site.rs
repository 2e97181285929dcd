//! Desired state: the sites that should be monitored and how.

use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path};

use crate::error::Error;

pub const SCHEME_HTTP: &str = "http";
pub const SCHEME_HTTPS: &str = "https";

/// Whether a keyword monitor expects its keyword on the page or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordPolarity {
    /// The page must contain the keyword.
    Exists,
    /// The page must not contain the keyword.
    NotExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Anything other than exactly `http` is treated as `https`.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        if raw == SCHEME_HTTP {
            Self::Http
        } else {
            Self::Https
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => SCHEME_HTTP,
            Self::Https => SCHEME_HTTPS,
        }
    }

    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// One entry of the sitelist file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Website {
    #[serde(rename = "web-site-name")]
    pub name: String,
    #[serde(default)]
    pub config: WebsiteConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebsiteConfig {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub keyword_type: String,
    #[serde(default)]
    pub contact: Vec<String>,
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub port: Option<u16>,
}

impl Website {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: WebsiteConfig::default(),
        }
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.config.keyword = keyword.into();
        self
    }

    #[must_use]
    pub fn with_keyword_type(mut self, keyword_type: impl Into<String>) -> Self {
        self.config.keyword_type = keyword_type.into();
        self
    }

    #[must_use]
    pub fn with_contacts<I, S>(mut self, contacts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.contact = contacts.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    #[must_use]
    pub fn has_keyword(&self) -> bool {
        !self.config.keyword.is_empty()
    }

    /// `None` for plain reachability checks, where polarity is meaningless.
    #[must_use]
    pub fn polarity(&self) -> Option<KeywordPolarity> {
        if !self.has_keyword() {
            None
        } else if self.config.keyword_type.contains("not") {
            Some(KeywordPolarity::NotExists)
        } else {
            Some(KeywordPolarity::Exists)
        }
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        Scheme::normalize(&self.config.scheme)
    }

    /// Explicit port, else the scheme default. `0` counts as unset.
    #[must_use]
    pub fn port(&self) -> u16 {
        match self.config.port {
            Some(port) if port != 0 => port,
            _ => self.scheme().default_port(),
        }
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}", self.scheme().as_str(), self.name)
    }
}

/// Ordered desired state, validated on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sitelist(Vec<Website>);

impl Sitelist {
    /// Reads and validates a JSON sitelist.
    ///
    /// # Errors
    ///
    /// Fails when the file is unreadable, is not a JSON array of sites, or
    /// breaks one of the rules checked by [`Sitelist::new`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        let sites: Vec<Website> = serde_json::from_str(&content)?;
        Self::new(sites)
    }

    /// Trims site names and rejects empty or repeated ones.
    ///
    /// # Errors
    ///
    /// [`Error::EmptySiteName`] or [`Error::DuplicateSite`].
    pub fn new(sites: Vec<Website>) -> Result<Self, Error> {
        let mut seen = HashSet::new();
        let mut validated = Vec::with_capacity(sites.len());
        for (index, mut site) in sites.into_iter().enumerate() {
            site.name = site.name.trim().to_string();
            if site.name.is_empty() {
                return Err(Error::EmptySiteName(index));
            }
            if !seen.insert(site.name.clone()) {
                return Err(Error::DuplicateSite(site.name));
            }
            validated.push(site);
        }
        Ok(Self(validated))
    }

    #[must_use]
    pub fn sites(&self) -> &[Website] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
