//! Startup configuration for the chat endpoint and the real-time socket.
//!
//! DESIGN
//! ======
//! Values arrive from `clap` args (each backed by an env var) and are
//! validated here once, before any network activity. Target locations are
//! never compiled in; only timeouts carry defaults.

use reqwest::Url;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting was not supplied by flag or environment.
    #[error("missing setting: pass --{flag} or set {var}")]
    MissingSetting { flag: &'static str, var: &'static str },

    #[error("invalid URL for {setting}: {reason}")]
    InvalidUrl { setting: &'static str, reason: String },

    #[error("unsupported scheme '{scheme}' for {setting} (expected {expected})")]
    UnsupportedScheme {
        setting: &'static str,
        scheme: String,
        expected: &'static str,
    },

    #[error("{setting} must be greater than zero")]
    InvalidTimeout { setting: &'static str },
}

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

impl Timeouts {
    /// Reject zero values, which reqwest would treat as "expire immediately".
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] naming the offending setting.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.request_secs == 0 {
            return Err(ConfigError::InvalidTimeout { setting: "request timeout" });
        }
        if self.connect_secs == 0 {
            return Err(ConfigError::InvalidTimeout { setting: "connect timeout" });
        }
        Ok(self)
    }
}

/// Where chat messages are POSTed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub endpoint: Url,
    pub timeouts: Timeouts,
}

impl ChatConfig {
    /// Build a validated chat config.
    ///
    /// The endpoint must be an absolute `http`/`https` URL with a host.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is absent, malformed, or uses another
    /// scheme, or if a timeout is zero.
    pub fn new(endpoint: Option<&str>, timeouts: Timeouts) -> Result<Self, ConfigError> {
        let raw = endpoint
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingSetting { flag: "endpoint", var: "BOTCHAT_ENDPOINT" })?;
        let endpoint = parse_url("endpoint", raw)?;
        match endpoint.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConfigError::UnsupportedScheme {
                    setting: "endpoint",
                    scheme: other.to_owned(),
                    expected: "http or https",
                });
            }
        }
        Ok(Self { endpoint, timeouts: timeouts.validated()? })
    }
}

/// Where the shared real-time connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    pub url: Url,
}

impl SocketConfig {
    /// Build a validated socket config.
    ///
    /// `http`/`https` URLs are mapped to `ws`/`wss`, so the address of a
    /// plain web server can be given as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is absent, malformed, or not a web/socket
    /// scheme.
    pub fn new(url: Option<&str>) -> Result<Self, ConfigError> {
        let raw = url
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingSetting { flag: "socket-url", var: "BOTCHAT_SOCKET_URL" })?;
        let mut url = parse_url("socket URL", raw)?;
        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => {
                return Err(ConfigError::UnsupportedScheme {
                    setting: "socket URL",
                    scheme: other.to_owned(),
                    expected: "ws, wss, http or https",
                });
            }
        };
        url.set_scheme(scheme).map_err(|()| ConfigError::InvalidUrl {
            setting: "socket URL",
            reason: format!("cannot use scheme {scheme}"),
        })?;
        Ok(Self { url })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn parse_url(setting: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl { setting, reason: e.to_string() })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidUrl { setting, reason: "missing host".to_owned() });
    }
    Ok(url)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
