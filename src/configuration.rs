use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub scraper: ScraperSettings,
    pub sheets: SheetsSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

/// Scraper knobs. `max_results`, `max_retries` and `user_agent` are only the
/// file-level defaults; the worker prefers overrides stored in the
/// `configuration` table (editable from the dashboard).
#[derive(serde::Deserialize, Clone)]
pub struct ScraperSettings {
    pub base_url: String,
    pub webdriver_url: String,
    pub max_results: usize,
    pub max_retries: u32,
    pub user_agent: Option<String>,
    /// Whether a detected text captcha may block on stdin for a human to
    /// solve it. Off by default so unattended runs never stall.
    pub allow_manual_captcha: bool,
    pub min_request_delay_ms: u64,
    pub max_request_delay_ms: u64,
    pub min_retry_backoff_ms: u64,
    pub max_retry_backoff_ms: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct SheetsSettings {
    pub api_base_url: String,
    pub spreadsheet_id: String,
    pub access_token: String,
}

impl DatabaseSettings {
    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db().database(&self.database_name)
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");

    let settings = config::Config::builder()
        .add_source(config::File::from(base_path.join("configuration.yaml")))
        // APP_SCRAPER__MAX_RESULTS=5 overrides scraper.max_results
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
