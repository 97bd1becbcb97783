use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::error::{RelayError, Result};

/// Top-level configuration settings for the relay.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub hub: HubSettings,
    pub connection: ConnectionSettings,
    pub uploads: UploadSettings,
    pub logging: LoggingSettings,
}

/// Where the relay listens and which upgrade path it accepts.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub ws_path: String,
    pub max_connections: usize,
}

/// Fan-out parameters of the hub.
///
/// `echo_to_sender` decides whether a client receives its own messages back.
/// It is off by default. Browser clients that only render what the server
/// sends them need it on (`LANCHAT_HUB__ECHO_TO_SENDER=true`).
#[derive(Debug, Deserialize, Clone)]
pub struct HubSettings {
    pub send_queue_capacity: usize,
    pub echo_to_sender: bool,
}

/// Per-connection timing and framing limits used by the pumps.
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionSettings {
    pub write_wait_secs: u64,
    pub pong_wait_secs: u64,
    pub ping_period_secs: u64,
    pub max_message_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub public_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Applies a `host:port` listen address. An empty host (`:8080`) means
    /// all interfaces.
    pub fn apply_addr(&mut self, addr: &str) -> Result<()> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| RelayError::InvalidAddr(addr.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| RelayError::InvalidAddr(addr.to_string()))?;

        self.host = if host.is_empty() {
            "0.0.0.0".to_string()
        } else {
            host.trim_start_matches('[').trim_end_matches(']').to_string()
        };
        self.port = port;
        Ok(())
    }
}

impl ConnectionSettings {
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs.max(1))
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs.max(1))
    }

    /// Keepalive interval. Always shorter than the pong wait, otherwise a
    /// healthy peer would time out between two pings.
    pub fn ping_period(&self) -> Duration {
        let pong_wait = self.pong_wait();
        let period = Duration::from_secs(self.ping_period_secs);
        if period.is_zero() || period >= pong_wait {
            pong_wait * 9 / 10
        } else {
            period
        }
    }
}

/// Partial configuration loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub hub: Option<PartialHubSettings>,
    pub connection: Option<PartialConnectionSettings>,
    pub uploads: Option<PartialUploadSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ws_path: Option<String>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHubSettings {
    pub send_queue_capacity: Option<usize>,
    pub echo_to_sender: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PartialConnectionSettings {
    pub write_wait_secs: Option<u64>,
    pub pong_wait_secs: Option<u64>,
    pub ping_period_secs: Option<u64>,
    pub max_message_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialUploadSettings {
    pub dir: Option<PathBuf>,
    pub public_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

/// Defaults match a LAN deployment: listen on every interface, keep
/// uploads under the system temp directory.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                ws_path: "/ws".to_string(),
                max_connections: 1000,
            },
            hub: HubSettings {
                send_queue_capacity: 256,
                echo_to_sender: false,
            },
            connection: ConnectionSettings {
                write_wait_secs: 10,
                pong_wait_secs: 60,
                ping_period_secs: 54,
                max_message_size: 64 * 1024,
            },
            uploads: UploadSettings {
                dir: std::env::temp_dir().join("intranet-chat"),
                public_prefix: "/files".to_string(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
