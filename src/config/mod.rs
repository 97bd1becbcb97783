mod settings;

use crate::config::settings::PartialSettings;
use ::config::{Config, ConfigError, Environment, File};

pub use settings::{
    ConnectionSettings, HubSettings, LoggingSettings, ServerSettings, Settings, UploadSettings,
};

/// Environment variables use this prefix and a double underscore between
/// nesting levels, e.g. `LANCHAT_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "LANCHAT";

/// Loads the configuration from `config/default` (any format the `config`
/// crate understands) and `LANCHAT_*` environment variables, then merges it
/// with the default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(merge(partial, Settings::default()))
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let server = partial.server;
    let hub = partial.hub;
    let connection = partial.connection;
    let uploads = partial.uploads;
    let logging = partial.logging;

    Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            ws_path: server
                .as_ref()
                .and_then(|s| s.ws_path.clone())
                .unwrap_or(default.server.ws_path),
            max_connections: server
                .as_ref()
                .and_then(|s| s.max_connections)
                .unwrap_or(default.server.max_connections),
        },
        hub: HubSettings {
            send_queue_capacity: hub
                .as_ref()
                .and_then(|h| h.send_queue_capacity)
                .filter(|capacity| *capacity > 0)
                .unwrap_or(default.hub.send_queue_capacity),
            echo_to_sender: hub
                .as_ref()
                .and_then(|h| h.echo_to_sender)
                .unwrap_or(default.hub.echo_to_sender),
        },
        connection: ConnectionSettings {
            write_wait_secs: connection
                .as_ref()
                .and_then(|c| c.write_wait_secs)
                .unwrap_or(default.connection.write_wait_secs),
            pong_wait_secs: connection
                .as_ref()
                .and_then(|c| c.pong_wait_secs)
                .unwrap_or(default.connection.pong_wait_secs),
            ping_period_secs: connection
                .as_ref()
                .and_then(|c| c.ping_period_secs)
                .unwrap_or(default.connection.ping_period_secs),
            max_message_size: connection
                .as_ref()
                .and_then(|c| c.max_message_size)
                .unwrap_or(default.connection.max_message_size),
        },
        uploads: UploadSettings {
            dir: uploads
                .as_ref()
                .and_then(|u| u.dir.clone())
                .unwrap_or(default.uploads.dir),
            public_prefix: uploads
                .as_ref()
                .and_then(|u| u.public_prefix.clone())
                .unwrap_or(default.uploads.public_prefix),
        },
        logging: LoggingSettings {
            level: logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
        },
    }
}

#[cfg(test)]
mod tests;
