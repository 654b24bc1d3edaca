use crate::error::{Error, Result};
use crate::metrics::Labels;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;
use url::Url;

/// Prefix prepended to every series name when none is configured.
pub const DEFAULT_PREFIX: &str = "pw_";

const URL_ENV: &str = "PROMETHEUS_REMOTE_WRITE_URL";
const PREFIX_ENV: &str = "PROMETHEUS_REMOTE_WRITE_PREFIX";
const USERNAME_ENV: &str = "PROMETHEUS_REMOTE_WRITE_USERNAME";
const PASSWORD_ENV: &str = "PROMETHEUS_REMOTE_WRITE_PASSWORD";

/// Basic auth credentials sent with every push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Construction options for the reporter.
///
/// Only `server_url` is required; it stays optional here so a missing value
/// can be reported with a descriptive error at construction instead of a
/// deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReporterOptions {
    /// Remote write endpoint, e.g. `http://localhost:9090/api/v1/write`.
    pub server_url: Option<String>,
    /// Extra HTTP headers attached to every push.
    pub headers: BTreeMap<String, String>,
    pub auth: Option<Auth>,
    /// Prepended to every series name at flush time.
    pub prefix: String,
    /// Static labels merged into every pushed series.
    pub labels: Labels,
    /// Environment variables exposed as a descriptive series. Empty unless
    /// the operator opts in.
    pub env: BTreeMap<String, String>,
    /// Per-request timeout for the HTTP client. No timeout when unset.
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            server_url: None,
            headers: BTreeMap::new(),
            auth: None,
            prefix: DEFAULT_PREFIX.to_string(),
            labels: Labels::new(),
            env: BTreeMap::new(),
            timeout_ms: None,
            user_agent: None,
        }
    }
}

impl ReporterOptions {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: Some(server_url.into()),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.auth = Some(Auth {
            username: username.into(),
            password,
        });
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    /// Exposes a single environment variable, read from the current process,
    /// in the `env` series. Unset variables are skipped.
    pub fn with_env(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if let Ok(value) = env::var(&name) {
            self.env.insert(name, value);
        }
        self
    }

    /// Parses options from a JSON document using the camelCase keys of the
    /// reporter configuration.
    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        serde_json::from_str(data).context("failed to parse reporter options as JSON")
    }

    /// Builds options from `PROMETHEUS_REMOTE_WRITE_*` environment variables.
    /// Missing variables fall back to the defaults.
    pub fn from_env() -> Self {
        let mut options = Self {
            server_url: env::var(URL_ENV).ok().filter(|url| !url.is_empty()),
            ..Self::default()
        };
        if let Ok(prefix) = env::var(PREFIX_ENV) {
            options.prefix = prefix;
        }
        if let Ok(username) = env::var(USERNAME_ENV) {
            options.auth = Some(Auth {
                username,
                password: env::var(PASSWORD_ENV).ok(),
            });
        }
        options
    }

    /// Checks the required fields and returns the parsed remote write url.
    pub fn validate(&self) -> Result<Url> {
        let raw = match self.server_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return Err(Error::MissingServerUrl),
        };
        Url::parse(raw).map_err(|source| Error::InvalidServerUrl {
            url: raw.to_string(),
            source,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("prometheus-remote-writer/{}", env!("CARGO_PKG_VERSION")))
    }
}
