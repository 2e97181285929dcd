use serde::Deserialize;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::error::Error;
use crate::uptimerobot::DEFAULT_API_URL;

pub const CONFIG_PATH_VAR: &str = "UPTIMESYNC_CONFIG";
pub const TOKEN_VAR: &str = "UPTIMEROBOT_TOKEN";
pub const EMAIL_VAR: &str = "UPTIMEROBOT_EMAIL";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub config: ConfigOptions,
    #[serde(default)]
    pub accounts: Vec<AccountCredentials>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigOptions {
    #[serde(default = "default_sitelist_path")]
    pub sitelist_path: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            sitelist_path: default_sitelist_path(),
            timeout_secs: default_timeout_secs(),
            api_url: default_api_url(),
        }
    }
}

fn default_sitelist_path() -> PathBuf {
    PathBuf::from("sitelist.json")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Credentials of one provider account. Order matters: earlier accounts are
/// filled first.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AccountCredentials {
    pub token: String,
    #[serde(default)]
    pub email: String,
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("token", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

impl Config {
    /// Loads the configuration from `$UPTIMESYNC_CONFIG`, or from the user
    /// config directory when that variable is unset. `.env` files are read
    /// first.
    ///
    /// # Errors
    ///
    /// Fails when the file is unreadable or invalid, or when no usable account
    /// credentials are found.
    pub fn load() -> Result<Config, Error> {
        let _ = dotenvy::dotenv();

        let mut config = match dotenvy::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::parse_file(path)?,
            Err(_) => match default_config_path() {
                Some(path) if path.exists() => Self::parse_file(path)?,
                _ => Config::default(),
            },
        };

        // Fall back to the environment when the file declares no account
        if config.accounts.is_empty() {
            config.accounts =
                accounts_from_env(dotenvy::var(TOKEN_VAR).ok(), dotenvy::var(EMAIL_VAR).ok())?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reads a config file without touching the environment.
    ///
    /// # Errors
    ///
    /// I/O, TOML or validation errors.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_file<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.config.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".into()));
        }
        let url = Url::parse(&self.config.api_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Config(format!(
                "api_url must use http or https: {}",
                self.config.api_url
            )));
        }
        if self.accounts.is_empty() {
            return Err(Error::Config(format!(
                "no accounts configured; add [[accounts]] or set {TOKEN_VAR}"
            )));
        }
        if let Some(index) = self.accounts.iter().position(|a| a.token.trim().is_empty()) {
            return Err(Error::Config(format!("account {index} has an empty token")));
        }
        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// The API base URL, always ending in `/`.
    ///
    /// # Errors
    ///
    /// `api_url` is not a valid URL.
    pub fn api_url(&self) -> Result<Url, Error> {
        let raw = &self.config.api_url;
        if raw.ends_with('/') {
            Ok(Url::parse(raw)?)
        } else {
            Ok(Url::parse(&format!("{raw}/"))?)
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("uptimesync").join("config.toml"))
}

/// Zips comma-separated token and email lists into accounts.
///
/// # Errors
///
/// Returns [`Error::Config`] when both lists are present but differ in length.
pub fn accounts_from_env(
    tokens: Option<String>,
    emails: Option<String>,
) -> Result<Vec<AccountCredentials>, Error> {
    let split = |raw: Option<String>| -> Vec<String> {
        raw.filter(|s| !s.trim().is_empty())
            .map(|s| s.split(',').map(|part| part.trim().to_string()).collect())
            .unwrap_or_default()
    };
    let tokens = split(tokens);
    let mut emails = split(emails);

    if emails.is_empty() {
        emails = vec![String::new(); tokens.len()];
    } else if emails.len() != tokens.len() {
        return Err(Error::Config(format!(
            "{TOKEN_VAR} has {} entries but {EMAIL_VAR} has {}",
            tokens.len(),
            emails.len()
        )));
    }

    Ok(tokens
        .into_iter()
        .zip(emails)
        .map(|(token, email)| AccountCredentials { token, email })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "{content}").expect("Failed to write to temp file");
        file
    }

    #[test]
    fn test_load_config_from_toml() {
        let file = write_config(
            r#"
            [config]
            sitelist_path = "/etc/uptimesync/sitelist.json"
            timeout_secs = 5
            api_url = "http://localhost:8080/v2"

            [[accounts]]
            token = "u1-abc"
            email = "first@example.com"

            [[accounts]]
            token = "u2-def"
            email = "second@example.com"
        "#,
        );

        let config = Config::load_from(file.path()).expect("Failed to parse config");

        assert_eq!(config.config.sitelist_path, PathBuf::from("/etc/uptimesync/sitelist.json"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.api_url().unwrap().as_str(), "http://localhost:8080/v2/");
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[0].token, "u1-abc");
        assert_eq!(config.accounts[1].email, "second@example.com");
    }

    #[test]
    fn test_defaults_apply() {
        let file = write_config(
            r#"
            [[accounts]]
            token = "u1-abc"
        "#,
        );

        let config = Config::load_from(file.path()).expect("Failed to parse config");
        assert_eq!(config.config.sitelist_path, PathBuf::from("sitelist.json"));
        assert_eq!(config.config.timeout_secs, 30);
        assert_eq!(config.api_url().unwrap().as_str(), DEFAULT_API_URL);
        assert_eq!(config.accounts[0].email, "");
    }

    #[test]
    fn test_rejects_missing_accounts() {
        let file = write_config("[config]\ntimeout_secs = 5\n");
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("no accounts")), "{err}");
    }

    #[test]
    fn test_rejects_zero_timeout_and_bad_url() {
        let file = write_config("[config]\ntimeout_secs = 0\n[[accounts]]\ntoken = \"t\"\n");
        assert!(matches!(Config::load_from(file.path()), Err(Error::Config(_))));

        let file = write_config("[config]\napi_url = \"not a url\"\n[[accounts]]\ntoken = \"t\"\n");
        assert!(matches!(Config::load_from(file.path()), Err(Error::UrlParse(_))));

        let file =
            write_config("[config]\napi_url = \"ftp://host/\"\n[[accounts]]\ntoken = \"t\"\n");
        assert!(matches!(Config::load_from(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_empty_token() {
        let file = write_config("[[accounts]]\ntoken = \" \"\nemail = \"a@example.com\"\n");
        assert!(matches!(Config::load_from(file.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[config\n");
        assert!(matches!(Config::load_from(file.path()), Err(Error::TomlParse(_))));
    }

    #[test]
    fn test_accounts_from_env() {
        let accounts = accounts_from_env(
            Some("u1-abc, u2-def".to_string()),
            Some("first@example.com,second@example.com".to_string()),
        )
        .unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].token, "u2-def");
        assert_eq!(accounts[1].email, "second@example.com");

        let accounts = accounts_from_env(Some("u1-abc".to_string()), None).unwrap();
        assert_eq!(accounts[0].email, "");

        assert!(accounts_from_env(None, None).unwrap().is_empty());
        assert!(accounts_from_env(Some("a,b".to_string()), Some("x".to_string())).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = AccountCredentials {
            token: "u1-secret".to_string(),
            email: "ops@example.com".to_string(),
        };
        assert!(!format!("{creds:?}").contains("u1-secret"));
    }
}
