//! Reconnection policy for the server connection.
//!
//! The [`ReconnectManager`] never connects anything itself. Each tick the
//! driver asks it whether an attempt is due; the actual connect happens in
//! the infrastructure layer and the result is handed back to the driver.

use std::fmt;
use std::time::{Duration, Instant};

use hidflow_core::protocol::DEFAULT_PORT;
use thiserror::Error;
use tracing::info;

/// Minimum spacing between two connection attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// URL prefixes accepted in front of `host[:port]`.
const URL_PREFIXES: [&str; 3] = ["tcp://", "synergy://", "deskflow://"];

/// Errors for server URLs that cannot name an endpoint.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("server URL '{0}' has no host")]
    MissingHost(String),
    #[error("server URL '{0}' is not a valid host[:port]")]
    InvalidHost(String),
}

/// A server to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address, without brackets for IPv6.
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses a server URL.
    ///
    /// Accepts `host`, `host:port`, `[v6]:port`, and the same forms behind a
    /// `tcp://`, `synergy://`, or `deskflow://` prefix. A missing, zero, or
    /// unparseable port falls back to [`DEFAULT_PORT`]. An empty string means
    /// no remote endpoint and yields `Ok(None)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hidflow_bridge::application::reconnect::Endpoint;
    ///
    /// let endpoint = Endpoint::parse("deskflow://10.0.0.5:24801").unwrap();
    /// assert_eq!(endpoint, Some(Endpoint::new("10.0.0.5", 24801)));
    /// assert_eq!(Endpoint::parse("  ").unwrap(), None);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] when no host remains after stripping the
    /// prefix and port, or the host contains characters no host name can.
    pub fn parse(url: &str) -> Result<Option<Self>, EndpointError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let mut rest = trimmed;
        for prefix in URL_PREFIXES {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped;
                break;
            }
        }
        let rest = rest.trim_end_matches('/');

        let (host, port) = split_host_port(rest);
        if host.is_empty() {
            return Err(EndpointError::MissingHost(trimmed.to_string()));
        }
        if host.chars().any(|c| c.is_whitespace() || matches!(c, '/' | '[' | ']' | '@')) {
            return Err(EndpointError::InvalidHost(trimmed.to_string()));
        }

        let port = port
            .and_then(|p| p.parse::<u16>().ok())
            .filter(|&p| p != 0)
            .unwrap_or(DEFAULT_PORT);
        Ok(Some(Self::new(host, port)))
    }
}

fn split_host_port(s: &str) -> (&str, Option<&str>) {
    if let Some(inner) = s.strip_prefix('[') {
        return match inner.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':')),
            None => (s, None),
        };
    }
    match s.rsplit_once(':') {
        // More than one colon without brackets is a bare IPv6 address.
        Some((host, _)) if host.contains(':') => (s, None),
        Some((host, port)) => (host, Some(port)),
        None => (s, None),
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Decides when to (re)connect to the configured endpoint.
#[derive(Debug, Clone)]
pub struct ReconnectManager {
    endpoint: Option<Endpoint>,
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl Default for ReconnectManager {
    fn default() -> Self {
        Self::new(RECONNECT_INTERVAL)
    }
}

impl ReconnectManager {
    pub fn new(interval: Duration) -> Self {
        Self {
            endpoint: None,
            interval,
            last_attempt: None,
        }
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replaces the configured endpoint.
    ///
    /// Returns `true` if it changed. A change resets the retry timer so the
    /// next [`poll`](Self::poll) attempts right away; the caller is expected
    /// to drop any connection to the old endpoint.
    pub fn update_endpoint(&mut self, endpoint: Option<Endpoint>) -> bool {
        if endpoint == self.endpoint {
            return false;
        }
        match &endpoint {
            Some(new) => info!(endpoint = %new, "remote endpoint set"),
            None => info!("remote endpoint cleared"),
        }
        self.endpoint = endpoint;
        self.last_attempt = None;
        true
    }

    /// Returns the endpoint to connect to if an attempt is due.
    ///
    /// Nothing is due while disabled or connected, or within the retry
    /// interval of the previous attempt. Returning an endpoint counts as an
    /// attempt.
    pub fn poll(&mut self, now: Instant, connected: bool) -> Option<Endpoint> {
        let endpoint = self.endpoint.as_ref()?;
        if connected {
            return None;
        }
        if let Some(last) = self.last_attempt {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        self.last_attempt = Some(now);
        Some(endpoint.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
