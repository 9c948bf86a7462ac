use std::time::Duration;

use clap::Parser;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "navigation-server", version, about = "Pushes navigation commands to map pages")]
pub struct Config {
    #[arg(long, env = "NAV_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "NAV_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Address of the map page, handed out with every new session.
    #[arg(long, env = "NAV_VIEWER_BASE_URL", default_value = "http://localhost:8000/")]
    pub viewer_base_url: String,

    #[arg(long, env = "AMAP_API_KEY")]
    pub amap_api_key: Option<String>,

    #[arg(long, env = "AMAP_SECURITY_CODE")]
    pub amap_security_code: Option<String>,

    /// Refuse websocket attaches for session ids the server never issued.
    #[arg(long, env = "NAV_STRICT_ATTACH")]
    pub strict_attach: bool,

    #[arg(long, default_value_t = 5)]
    pub heartbeat_interval_secs: u64,

    #[arg(long, default_value_t = 30)]
    pub client_timeout_secs: u64,

    /// Commands a viewer may have waiting on its actor before further sends
    /// are reported as not delivered. Frames already handed to the socket are
    /// only bounded by the client timeout.
    #[arg(long, default_value_t = 32)]
    pub outbound_buffer: usize,

    #[arg(long, env = "NAV_PERMISSIVE_CORS")]
    pub permissive_cors: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("AMAP_API_KEY and AMAP_SECURITY_CODE must be set together")]
    IncompleteMapKeys,
    #[error("client timeout ({timeout:?}) must be longer than the heartbeat interval ({interval:?})")]
    HeartbeatTooSlow {
        interval: Duration,
        timeout: Duration,
    },
    #[error("outbound buffer must hold at least one message")]
    EmptyOutboundBuffer,
}

#[derive(Debug, Clone)]
pub struct MapKeys {
    pub api_key: String,
    pub security_code: String,
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub strict_attach: bool,
    pub heartbeat_interval: Duration,
    pub client_timeout: Duration,
    pub outbound_buffer: usize,
}

impl std::default::Default for GatewaySettings {
    fn default() -> Self {
        Self {
            strict_attach: false,
            heartbeat_interval: Duration::from_secs(5),
            client_timeout: Duration::from_secs(30),
            outbound_buffer: 32,
        }
    }
}

/// Validated runtime settings shared with the handlers.
#[derive(Debug, Clone)]
pub struct Settings {
    pub viewer_base_url: String,
    pub map_keys: Option<MapKeys>,
    pub gateway: GatewaySettings,
}

impl std::default::Default for Settings {
    fn default() -> Self {
        Self {
            viewer_base_url: "http://localhost:8000/".into(),
            map_keys: None,
            gateway: GatewaySettings::default(),
        }
    }
}

impl Config {
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let map_keys = match (&self.amap_api_key, &self.amap_security_code) {
            (Some(api_key), Some(security_code)) => Some(MapKeys {
                api_key: api_key.clone(),
                security_code: security_code.clone(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteMapKeys),
        };

        let interval = Duration::from_secs(self.heartbeat_interval_secs);
        let timeout = Duration::from_secs(self.client_timeout_secs);
        if timeout <= interval {
            return Err(ConfigError::HeartbeatTooSlow { interval, timeout });
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::EmptyOutboundBuffer);
        }

        Ok(Settings {
            viewer_base_url: self.viewer_base_url.clone(),
            map_keys,
            gateway: GatewaySettings {
                strict_attach: self.strict_attach,
                heartbeat_interval: interval,
                client_timeout: timeout,
                outbound_buffer: self.outbound_buffer,
            },
        })
    }
}
