use thiserror::Error;

/// Fatal errors: anything here aborts the run before a provider is touched.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Sitelist parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Site {0:?} is declared more than once in the sitelist")]
    DuplicateSite(String),
    #[error("Sitelist entry {0} has an empty web-site-name")]
    EmptySiteName(usize),
}
