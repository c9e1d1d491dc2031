use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "SHELF_ENV";
const CONFIG_DIR_ENV: &str = "SHELF_CONFIG_DIR";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw {
            "local" => Ok(Self::Local),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub roles: RoleSettings,
    #[serde(default)]
    pub delivery: DeliverySettings,
    #[serde(default)]
    pub lookup: LookupSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// and `SHELF_*` variables (nested keys separated by `__`).
    pub fn load() -> anyhow::Result<Self> {
        // A missing `.env` file is fine.
        dotenvy::dotenv().ok();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .map(|cwd| cwd.join("config"))
                .with_context(|| "unable to resolve current directory")?,
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("SHELF")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("roles.editors")
                    .with_list_parse_key("roles.readers")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = Environment::parse(environment)?;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    // Large listings are paced, so a webhook call can legitimately take a while.
    fn default_request_timeout_ms() -> u64 {
        60_000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Bot API credentials and the shared secret expected on inbound webhooks.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSettings {
    #[serde(default = "TelegramSettings::default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub secret_token: String,
    /// Per-request timeout for outbound `sendMessage` calls.
    #[serde(default = "TelegramSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl TelegramSettings {
    fn default_api_base() -> String {
        "https://api.telegram.org".to_string()
    }

    fn default_timeout_ms() -> u64 {
        10_000
    }
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            api_base: Self::default_api_base(),
            bot_token: String::new(),
            secret_token: String::new(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// Chat user ids granted each role.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RoleSettings {
    #[serde(default)]
    pub editors: Vec<i64>,
    #[serde(default)]
    pub readers: Vec<i64>,
}

/// Outbound pagination and pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliverySettings {
    #[serde(default = "DeliverySettings::default_list_batch_size")]
    pub list_batch_size: usize,
    #[serde(default = "DeliverySettings::default_detail_batch_size")]
    pub detail_batch_size: usize,
    #[serde(default = "DeliverySettings::default_pacing_ms")]
    pub pacing_ms: u64,
}

impl DeliverySettings {
    fn default_list_batch_size() -> usize {
        25
    }

    fn default_detail_batch_size() -> usize {
        1
    }

    fn default_pacing_ms() -> u64 {
        30
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            list_batch_size: Self::default_list_batch_size(),
            detail_batch_size: Self::default_detail_batch_size(),
            pacing_ms: Self::default_pacing_ms(),
        }
    }
}

/// Endpoints of the metadata providers, primary first.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupSettings {
    #[serde(default = "LookupSettings::default_google_books_base")]
    pub google_books_base: String,
    #[serde(default = "LookupSettings::default_open_library_base")]
    pub open_library_base: String,
    #[serde(default = "LookupSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl LookupSettings {
    fn default_google_books_base() -> String {
        "https://www.googleapis.com/books/v1".to_string()
    }

    fn default_open_library_base() -> String {
        "https://openlibrary.org".to_string()
    }

    fn default_timeout_ms() -> u64 {
        10_000
    }
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            google_books_base: Self::default_google_books_base(),
            open_library_base: Self::default_open_library_base(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_delivery_matches_chat_rate_limits() {
        let settings = Settings::default();
        assert_eq!(settings.delivery.list_batch_size, 25);
        assert_eq!(settings.delivery.detail_batch_size, 1);
        assert_eq!(settings.delivery.pacing_ms, 30);
    }

    #[test]
    fn default_roles_are_empty() {
        let settings = Settings::default();
        assert!(settings.roles.editors.is_empty());
        assert!(settings.roles.readers.is_empty());
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!(Environment::parse("qa").is_err());
        assert_eq!(Environment::parse("staging").ok(), Some(Environment::Staging));
    }

    #[test]
    fn load_from_reads_base_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.toml"),
            "[roles]\neditors = [11, 12]\nreaders = [20]\n\n[delivery]\npacing_ms = 5\n",
        )
        .unwrap();

        let settings = Settings::load_from(dir.path(), "local").unwrap();
        assert_eq!(settings.roles.editors, vec![11, 12]);
        assert_eq!(settings.roles.readers, vec![20]);
        assert_eq!(settings.delivery.pacing_ms, 5);
        assert_eq!(settings.delivery.list_batch_size, 25);
    }

    #[test]
    fn telegram_timeout_is_independent_of_lookup_timeout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.toml"),
            "[telegram]\ntimeout_ms = 2500\n\n[lookup]\ntimeout_ms = 8000\n",
        )
        .unwrap();

        let settings = Settings::load_from(dir.path(), "local").unwrap();
        assert_eq!(settings.telegram.timeout_ms, 2500);
        assert_eq!(settings.lookup.timeout_ms, 8000);
        assert_eq!(Settings::default().telegram.timeout_ms, 10_000);
    }
}
