//! Configuration types for hf-queue-sync

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Main configuration for the synchronization engine
///
/// All fields have sensible defaults for a queue server running as a
/// co-located local process; `Config::default()` works out of the box
/// against `http://127.0.0.1:8000`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the queue server (default: `http://127.0.0.1:8000`)
    ///
    /// REST endpoints live under `{server_url}/api`, the push subscription
    /// under `{server_url}/ws/progress` with the scheme switched to `ws`.
    #[serde(default = "default_server_url")]
    pub server_url: Url,

    /// Interval between full listing polls (default: 3 s)
    ///
    /// Polling is a resilience fallback, not the primary channel; it bounds
    /// how stale the view can get when push updates are missed.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Delay before reconnecting a dropped push subscription (default: 3 s)
    ///
    /// The reconnect loop is unbounded and the delay fixed: the server is
    /// assumed to be a co-located process whose restarts are brief.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: Duration,

    /// Timeout applied to each control/listing HTTP request (default: 30 s)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Buffer size of the event broadcast channel (default: 1000)
    ///
    /// Subscribers that fall behind by more than this many events receive a
    /// `Lagged` error from the broadcast receiver.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_server_url() -> Url {
    // The literal is a valid URL; parsing it cannot fail.
    #[allow(clippy::unwrap_used)]
    Url::parse("http://127.0.0.1:8000").unwrap()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_event_capacity() -> usize {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_interval: default_poll_interval(),
            reconnect_delay: default_reconnect_delay(),
            request_timeout: default_request_timeout(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Config {
    /// Base URL for the REST API (`{server_url}/api`)
    pub fn api_base(&self) -> Result<Url> {
        self.server_url
            .join("api/")
            .map_err(|e| Error::Config {
                message: format!("cannot derive API base from server_url: {}", e),
                key: Some("server_url".to_string()),
            })
    }

    /// URL of the push subscription endpoint (`ws://{host}/ws/progress`)
    pub fn push_url(&self) -> Result<Url> {
        let mut url = self.server_url.join("ws/progress").map_err(|e| Error::Config {
            message: format!("cannot derive push URL from server_url: {}", e),
            key: Some("server_url".to_string()),
        })?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme).map_err(|_| Error::Config {
            message: format!("cannot set websocket scheme on {}", url),
            key: Some("server_url".to_string()),
        })?;

        Ok(url)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_local_server() {
        let config = Config::default();
        assert_eq!(config.server_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.event_capacity, 1000);
    }

    #[test]
    fn api_base_appends_api_segment() {
        let config = Config::default();
        assert_eq!(config.api_base().unwrap().as_str(), "http://127.0.0.1:8000/api/");
    }

    #[test]
    fn push_url_switches_scheme_to_ws() {
        let config = Config::default();
        assert_eq!(
            config.push_url().unwrap().as_str(),
            "ws://127.0.0.1:8000/ws/progress"
        );
    }

    #[test]
    fn push_url_uses_wss_for_https_servers() {
        let config = Config {
            server_url: Url::parse("https://queue.example.com:8443").unwrap(),
            ..Default::default()
        };
        assert_eq!(
            config.push_url().unwrap().as_str(),
            "wss://queue.example.com:8443/ws/progress"
        );
    }

    #[test]
    fn config_deserializes_from_partial_json() {
        let config: Config =
            serde_json::from_str(r#"{"server_url": "http://127.0.0.1:9001"}"#).unwrap();
        assert_eq!(config.server_url.as_str(), "http://127.0.0.1:9001/");
        assert_eq!(config.poll_interval, Duration::from_secs(3));
    }
}
