//! Configuration for retrieving a thread.
//!
//! Only the page navigator and the command line driver take configuration;
//! parsing and hierarchy building are configuration free.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2200);
pub const DEFAULT_JITTER: Duration = Duration::from_millis(1100);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const DEFAULT_OUTPUT_PATH: &str = "hierarchy_reading_view.csv";
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Settings for fetching the pages of one thread.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// URL of the thread's first page
    pub thread_url: String,
    /// Upper bound on pages fetched; `None` fetches every detected page
    pub max_pages: Option<u32>,
    /// Fixed pause between two page requests
    pub base_delay: Duration,
    /// Upper bound of the random extra pause added to `base_delay`
    pub jitter: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
    /// Where the reading view CSV is written
    pub output_path: PathBuf,
}

impl ScrapeConfig {
    /// Configuration for `thread_url` with every other setting at its default.
    pub fn new(thread_url: impl Into<String>) -> Self {
        Self {
            thread_url: thread_url.into(),
            max_pages: None,
            base_delay: DEFAULT_BASE_DELAY,
            jitter: DEFAULT_JITTER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `THREAD_URL` is missing or a numeric variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(None, env_var)
    }

    /// Load configuration from environment variables, with `thread_url`
    /// taking precedence over `THREAD_URL` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if no thread URL is available or a numeric variable is malformed.
    pub fn from_env_or_url(thread_url: Option<&str>) -> Result<Self, ConfigError> {
        Self::from_lookup(thread_url, env_var)
    }

    /// Build configuration from any variable source, `std::env` or otherwise.
    ///
    /// Unset and blank variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `thread_url` nor `THREAD_URL` is set, or a
    /// numeric variable is malformed.
    pub fn from_lookup<F>(thread_url: Option<&str>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let thread_url = match thread_url {
            Some(url) => url.to_string(),
            None => vars.required("THREAD_URL")?,
        };
        let defaults = Self::new(thread_url);
        Ok(Self {
            max_pages: vars
                .optional("MAX_PAGES")
                .map(|value| parse_u32("MAX_PAGES", &value))
                .transpose()?,
            base_delay: Duration::from_millis(
                vars.parse_u64("BASE_DELAY_MS", millis(defaults.base_delay))?,
            ),
            jitter: Duration::from_millis(vars.parse_u64("JITTER_MS", millis(defaults.jitter))?),
            request_timeout: Duration::from_secs(
                vars.parse_u64("REQUEST_TIMEOUT_SECS", defaults.request_timeout.as_secs())?,
            ),
            user_agent: vars.or_default("USER_AGENT", &defaults.user_agent),
            accept_language: vars.or_default("ACCEPT_LANGUAGE", &defaults.accept_language),
            output_path: output_path_with(&vars.0),
            ..defaults
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread URL is not an absolute http(s) URL or
    /// the page limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.thread_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::InvalidValue {
                    name: "THREAD_URL".to_string(),
                    message: format!("unsupported scheme '{}'", url.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    name: "THREAD_URL".to_string(),
                    message: e.to_string(),
                })
            }
        }

        if self.max_pages == Some(0) {
            return Err(ConfigError::InvalidValue {
                name: "MAX_PAGES".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// The CSV destination from `OUTPUT_PATH`, or the default when unset.
pub fn output_path_from_env() -> PathBuf {
    output_path_with(&env_var)
}

fn output_path_with<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    Vars(lookup)
        .optional("OUTPUT_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH))
}

/// A variable source where blank values count as unset.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parse_u64(&self, name: &str, default: u64) -> Result<u64, ConfigError> {
        match self.optional(name) {
            Some(value) => value.trim().parse().map_err(|source| ConfigError::ParseInt {
                name: name.to_string(),
                source,
            }),
            None => Ok(default),
        }
    }
}

fn parse_u32(name: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|source| ConfigError::ParseInt {
        name: name.to_string(),
        source,
    })
}
