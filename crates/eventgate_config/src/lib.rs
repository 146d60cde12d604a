//! Configuration loading
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults (`Settings::default()`)
//! 2. an optional file, `config/default.{toml,yaml,json,...}`
//! 3. environment variables prefixed `SSE_`, sections separated by `__`,
//!    e.g. `SSE_SERVER__PORT=8080` or `SSE_AUTH__APP_KEY=...`
//! 4. the flat variables older deployments use (`SSE_PORT`, `SSE_APP_KEY`,
//!    `SSE_CLIENT_USERNAME`, ..., `ALLOWED_ORIGIN`)
//!
//! `.env` files are not read here; the binary loads them into the process
//! environment before calling `load_config`.

pub mod settings;

use config::{Config, ConfigError, Environment, File};

use crate::settings::PartialSettings;

pub use settings::{AuthSettings, BrokerSettings, LogSettings, ServerSettings, Settings};

const DEFAULT_CONFIG_FILE: &str = "config/default";

/// Flat environment variables and the keys they set.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("SSE_PORT", "server.port"),
    ("ALLOWED_ORIGIN", "server.allowed_origin"),
    ("SSE_APP_KEY", "auth.app_key"),
    ("SSE_CLIENT_USERNAME", "auth.client_username"),
    ("SSE_CLIENT_PASSWORD", "auth.client_password"),
    ("SSE_BROADCASTER_USERNAME", "auth.broadcaster_username"),
    ("SSE_BROADCASTER_PASSWORD", "auth.broadcaster_password"),
];

pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Load settings using `file` (without extension) as the optional file source,
/// then validate them.
pub fn load_config_from(file: &str) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(file).required(false))
        .add_source(
            Environment::with_prefix("SSE")
                .prefix_separator("_")
                .separator("__"),
        );

    for (var, key) in LEGACY_ENV {
        builder = builder.set_override_option(*key, std::env::var(var).ok())?;
    }

    let partial: PartialSettings = builder.build()?.try_deserialize()?;
    let settings = partial.merge(Settings::default());
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    /// The signing key and both credential pairs are mandatory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.auth;
        let required = [
            ("auth.app_key", &auth.app_key),
            ("auth.client_username", &auth.client_username),
            ("auth.client_password", &auth.client_password),
            ("auth.broadcaster_username", &auth.broadcaster_username),
            ("auth.broadcaster_password", &auth.broadcaster_password),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::Message(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }
        if auth.token_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "auth.token_ttl_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
