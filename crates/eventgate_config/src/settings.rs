use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub broker: BrokerSettings,
    pub log: LogSettings,
}

/// HTTP listener settings.
///
/// `allowed_origin` enables CORS for that origin when set. `keep_alive_secs`
/// is the interval of comment frames on idle streams; `0` turns them off.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origin: Option<String>,
    pub keep_alive_secs: u64,
}

/// Token signing key and the two credential pairs that may log in.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub app_key: String,
    pub client_username: String,
    pub client_password: String,
    pub broadcaster_username: String,
    pub broadcaster_password: String,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Publish a demo message every N seconds. Off when unset.
    pub demo_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Every field is optional; missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub auth: Option<PartialAuthSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub allowed_origin: Option<String>,
    pub keep_alive_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialAuthSettings {
    pub app_key: Option<String>,
    pub client_username: Option<String>,
    pub client_password: Option<String>,
    pub broadcaster_username: Option<String>,
    pub broadcaster_password: Option<String>,
    pub token_ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub demo_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Fill every missing value from `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let auth = self.auth.unwrap_or_default();
        let broker = self.broker.unwrap_or_default();
        let log = self.log.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
                allowed_origin: server
                    .allowed_origin
                    .filter(|origin| !origin.is_empty())
                    .or(defaults.server.allowed_origin),
                keep_alive_secs: server
                    .keep_alive_secs
                    .unwrap_or(defaults.server.keep_alive_secs),
            },
            auth: AuthSettings {
                app_key: auth.app_key.unwrap_or(defaults.auth.app_key),
                client_username: auth
                    .client_username
                    .unwrap_or(defaults.auth.client_username),
                client_password: auth
                    .client_password
                    .unwrap_or(defaults.auth.client_password),
                broadcaster_username: auth
                    .broadcaster_username
                    .unwrap_or(defaults.auth.broadcaster_username),
                broadcaster_password: auth
                    .broadcaster_password
                    .unwrap_or(defaults.auth.broadcaster_password),
                token_ttl_secs: auth.token_ttl_secs.unwrap_or(defaults.auth.token_ttl_secs),
            },
            broker: BrokerSettings {
                demo_interval_secs: broker
                    .demo_interval_secs
                    .or(defaults.broker.demo_interval_secs),
            },
            log: LogSettings {
                level: log.level.unwrap_or(defaults.log.level),
            },
        }
    }
}

/// Provides default values for `Settings`.
///
/// Secrets and credentials default to empty, which `Settings::validate`
/// rejects: they must come from a file or the environment.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 80,
                allowed_origin: None,
                keep_alive_secs: 15,
            },
            auth: AuthSettings {
                app_key: String::new(),
                client_username: String::new(),
                client_password: String::new(),
                broadcaster_username: String::new(),
                broadcaster_password: String::new(),
                token_ttl_secs: 3600,
            },
            broker: BrokerSettings {
                demo_interval_secs: None,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
