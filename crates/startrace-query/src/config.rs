//! Server address and client configuration.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::error::ConfigError;

pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 10101;

pub const ADDRESS_ENV: &str = "STARTRACE_ADDRESS";
pub const CONNECT_TIMEOUT_ENV: &str = "STARTRACE_CONNECT_TIMEOUT_SECS";
pub const REQUEST_TIMEOUT_ENV: &str = "STARTRACE_REQUEST_TIMEOUT_SECS";

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(([+a-z]+)://)?([0-9a-zA-Z.-]+|\[[:0-9a-fA-F]+\])?(:([0-9]+))?$")
            .expect("static address pattern")
    })
}

/// Location of a bitmap index server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    scheme: String,
    host: String,
    port: u16,
}

impl Uri {
    /// Parse `[scheme://][host][:port]`; missing parts take the defaults
    /// (`http`, `localhost`, `10101`). `":10101"` and `"localhost"` are both valid.
    pub fn from_address(address: &str) -> Result<Self, ConfigError> {
        let address = address.trim();
        let caps = address_pattern()
            .captures(address)
            .ok_or_else(|| ConfigError::InvalidAddress(address.to_string()))?;

        let scheme = caps.get(2).map_or(DEFAULT_SCHEME, |m| m.as_str());
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::UnsupportedScheme(scheme.to_string()));
        }
        let host = caps
            .get(3)
            .map(|m| m.as_str())
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST);
        let port = match caps.get(5) {
            Some(m) => m
                .as_str()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidAddress(address.to_string()))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `scheme://host:port`, without a trailing slash.
    pub fn normalize(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl Default for Uri {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalize())
    }
}

/// Settings for [`crate::http::HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub uri: Uri,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: Uri::default(),
            connect_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            ..Self::default()
        }
    }

    /// Load from `STARTRACE_ADDRESS`, `STARTRACE_CONNECT_TIMEOUT_SECS` and
    /// `STARTRACE_REQUEST_TIMEOUT_SECS`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(address) = lookup(ADDRESS_ENV) {
            config.uri = Uri::from_address(&address)?;
        }
        if let Some(secs) = lookup(CONNECT_TIMEOUT_ENV) {
            config.connect_timeout = parse_secs(CONNECT_TIMEOUT_ENV, &secs)?;
        }
        if let Some(secs) = lookup(REQUEST_TIMEOUT_ENV) {
            config.request_timeout = parse_secs(REQUEST_TIMEOUT_ENV, &secs)?;
        }
        Ok(config)
    }
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
        })
}
