//! Stream client configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`), with defaults matching the live
//! operations dashboard.

use std::time::Duration;

use crate::error::StreamError;

/// Path of the operations event stream on the dashboard API.
pub const STREAM_PATH: &str = "/api/ops/stream/";

/// Default dashboard API origin.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default keepalive period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);

/// Default fixed delay before each reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1_000);

/// Default reconnect budget.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default wait for the peer to finish a close handshake.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Stream client configuration.
///
/// Loaded once at startup via [`StreamConfig::from_env`], or built from
/// [`StreamConfig::default`] and adjusted in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Websocket URL of the operations stream (e.g.
    /// `ws://localhost:8000/api/ops/stream/`).
    pub url: String,

    /// Period between keepalive pings while connected.
    pub heartbeat_interval: Duration,

    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Number of reconnect attempts allowed after consecutive failures.
    pub max_reconnect_attempts: u32,

    /// How long `disconnect` waits for the server to acknowledge the close.
    pub close_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: format!("ws://localhost:8000{STREAM_PATH}"),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl StreamConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] if `OPS_STREAM_URL` or
    /// `OPS_API_BASE_URL` uses an unsupported scheme.
    pub fn from_env() -> Result<Self, StreamError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Numeric values that are missing or unparsable fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] if the resolved URL uses an
    /// unsupported scheme.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StreamError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = match lookup("OPS_STREAM_URL") {
            Some(url) => validate_ws_url(&url)?,
            None => {
                let base = lookup("OPS_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
                stream_url(&base)?
            }
        };

        Ok(Self {
            url,
            heartbeat_interval: Duration::from_millis(parse_var(
                &lookup,
                "HEARTBEAT_INTERVAL_MS",
                30_000,
            )),
            reconnect_delay: Duration::from_millis(parse_var(&lookup, "RECONNECT_DELAY_MS", 1_000)),
            max_reconnect_attempts: parse_var(
                &lookup,
                "MAX_RECONNECT_ATTEMPTS",
                DEFAULT_MAX_RECONNECT_ATTEMPTS,
            ),
            close_timeout: Duration::from_millis(parse_var(&lookup, "CLOSE_TIMEOUT_MS", 5_000)),
        })
    }

    /// Returns a copy of this configuration pointing at `url`.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Derives the stream websocket URL from a dashboard API origin.
///
/// `http` maps to `ws` and `https` to `wss`; [`STREAM_PATH`] is appended.
///
/// # Errors
///
/// Returns [`StreamError::InvalidConfig`] for any other scheme.
pub fn stream_url(base: &str) -> Result<String, StreamError> {
    let base = base.trim().trim_end_matches('/');
    let Some((scheme, rest)) = base.split_once("://") else {
        return Err(StreamError::InvalidConfig(format!(
            "missing scheme in base url `{base}`"
        )));
    };
    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(StreamError::InvalidConfig(format!(
                "unsupported scheme `{other}` in base url"
            )));
        }
    };
    if rest.is_empty() {
        return Err(StreamError::InvalidConfig(format!(
            "missing host in base url `{base}`"
        )));
    }
    Ok(format!("{ws_scheme}://{rest}{STREAM_PATH}"))
}

fn validate_ws_url(url: &str) -> Result<String, StreamError> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("ws://") || lower.starts_with("wss://") {
        Ok(url.to_string())
    } else {
        Err(StreamError::InvalidConfig(format!(
            "stream url `{url}` must use ws:// or wss://"
        )))
    }
}

/// Parses a looked-up value as `T`, returning `default` on missing or
/// invalid values.
fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_dashboard() {
        let Ok(cfg) = StreamConfig::from_lookup(lookup_from(&[])) else {
            panic!("defaults must load");
        };
        assert_eq!(cfg, StreamConfig::default());
        assert_eq!(cfg.url, "ws://localhost:8000/api/ops/stream/");
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(1));
        assert_eq!(cfg.max_reconnect_attempts, 5);
    }

    #[test]
    fn https_base_maps_to_wss() {
        let Ok(url) = stream_url("https://ops.example.net/") else {
            panic!("https base must map");
        };
        assert_eq!(url, "wss://ops.example.net/api/ops/stream/");
    }

    #[test]
    fn unsupported_scheme_rejected() {
        assert!(stream_url("ftp://ops.example.net").is_err());
        assert!(stream_url("ops.example.net").is_err());
        assert!(stream_url("http://").is_err());
    }

    #[test]
    fn explicit_stream_url_wins() {
        let lookup = lookup_from(&[
            ("OPS_STREAM_URL", "ws://10.0.0.5:9000/custom/"),
            ("OPS_API_BASE_URL", "https://ignored.example"),
        ]);
        let Ok(cfg) = StreamConfig::from_lookup(lookup) else {
            panic!("explicit url must load");
        };
        assert_eq!(cfg.url, "ws://10.0.0.5:9000/custom/");
    }

    #[test]
    fn explicit_stream_url_must_be_websocket() {
        let lookup = lookup_from(&[("OPS_STREAM_URL", "http://10.0.0.5/")]);
        let Err(err) = StreamConfig::from_lookup(lookup) else {
            panic!("http stream url must be rejected");
        };
        assert!(matches!(err, StreamError::InvalidConfig(_)));
    }

    #[test]
    fn numeric_overrides_and_fallbacks() {
        let lookup = lookup_from(&[
            ("HEARTBEAT_INTERVAL_MS", "250"),
            ("RECONNECT_DELAY_MS", "not-a-number"),
            ("MAX_RECONNECT_ATTEMPTS", "9"),
        ]);
        let Ok(cfg) = StreamConfig::from_lookup(lookup) else {
            panic!("overrides must load");
        };
        assert_eq!(cfg.heartbeat_interval, Duration::from_millis(250));
        assert_eq!(cfg.reconnect_delay, DEFAULT_RECONNECT_DELAY);
        assert_eq!(cfg.max_reconnect_attempts, 9);
        assert_eq!(cfg.close_timeout, DEFAULT_CLOSE_TIMEOUT);
    }
}
