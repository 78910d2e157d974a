use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::trace;

use crate::Location;
use crate::alerts::AlertThresholds;
use crate::ratelimit::RateLimitConfig;
use crate::schedule::ScheduleSpec;

/// Storage backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default for most deployments)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,

        /// Retention period in days (observations older than this are deleted)
        #[serde(default = "default_retention_days")]
        retention_days: u32,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./observations.db")
}

fn default_retention_days() -> u32 {
    1095
}

/// The monitored city. Defaults to Montreal.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_city")]
    pub name: String,

    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// IANA timezone used when asking providers for civil dates.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_city() -> String {
    "Montreal".to_string()
}

fn default_latitude() -> f64 {
    45.5019
}

fn default_longitude() -> f64 {
    -73.5673
}

fn default_timezone() -> String {
    "America/Toronto".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: default_city(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            timezone: default_timezone(),
        }
    }
}

impl LocationConfig {
    pub fn to_location(&self) -> Location {
        Location::with_coordinates(self.name.clone(), self.latitude, self.longitude)
    }
}

/// Open-Meteo needs no credentials; only the endpoints are configurable so
/// tests can point them at a mock server.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenMeteoConfig {
    #[serde(default = "default_open_meteo_archive_url")]
    pub archive_url: String,

    #[serde(default = "default_open_meteo_forecast_url")]
    pub forecast_url: String,
}

fn default_open_meteo_archive_url() -> String {
    "https://archive-api.open-meteo.com/v1/archive".to_string()
}

fn default_open_meteo_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            archive_url: default_open_meteo_archive_url(),
            forecast_url: default_open_meteo_forecast_url(),
        }
    }
}

/// WeatherAPI: single API key, read from config or `WEATHERAPI_KEY`.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherApiConfig {
    pub api_key: Option<String>,

    #[serde(default = "default_weather_api_url")]
    pub base_url: String,
}

fn default_weather_api_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_api_url(),
        }
    }
}

/// AerisWeather: paired credentials, read from config or
/// `AERIS_CLIENT_ID`/`AERIS_CLIENT_SECRET`.
#[derive(Debug, Clone, Deserialize)]
pub struct AerisConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    #[serde(default = "default_aeris_url")]
    pub base_url: String,
}

fn default_aeris_url() -> String {
    "https://api.aerisapi.com".to_string()
}

impl Default for AerisConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: default_aeris_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub open_meteo: OpenMeteoConfig,

    #[serde(default)]
    pub weather_api: WeatherApiConfig,

    #[serde(default)]
    pub aeris: AerisConfig,
}

/// Telegram transport credentials, read from config or
/// `TELEGRAM_TOKEN`/`TELEGRAM_CHAT_ID`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.chat_id.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().expect("valid default bind address")
}

fn default_enable_cors() -> bool {
    true
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            enable_cors: default_enable_cors(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportsConfig {
    /// Directory for monthly/yearly text reports.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Directory for sampled-data CSV exports.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub schedule: ScheduleSpec,

    /// How many weeks of history each cycle samples.
    #[serde(default = "default_sample_weeks_back")]
    pub sample_weeks_back: u32,

    #[serde(default)]
    pub thresholds: AlertThresholds,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub api: ApiServerConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub reports: ReportsConfig,
}

fn default_sample_weeks_back() -> u32 {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: LocationConfig::default(),
            providers: ProvidersConfig::default(),
            schedule: ScheduleSpec::default(),
            sample_weeks_back: default_sample_weeks_back(),
            thresholds: AlertThresholds::default(),
            rate_limit: RateLimitConfig::default(),
            storage: StorageConfig::default(),
            api: ApiServerConfig::default(),
            telegram: TelegramConfig::default(),
            reports: ReportsConfig::default(),
        }
    }
}

impl Config {
    /// Fill credential fields from the environment where the config file
    /// left them empty. `dotenv` has already been applied by the binary.
    pub fn apply_env(&mut self) {
        if self.providers.weather_api.api_key.is_none() {
            self.providers.weather_api.api_key = std::env::var("WEATHERAPI_KEY").ok();
        }
        if self.providers.aeris.client_id.is_none() {
            self.providers.aeris.client_id = std::env::var("AERIS_CLIENT_ID").ok();
        }
        if self.providers.aeris.client_secret.is_none() {
            self.providers.aeris.client_secret = std::env::var("AERIS_CLIENT_SECRET").ok();
        }
        if self.telegram.token.is_none() {
            self.telegram.token = std::env::var("TELEGRAM_TOKEN").ok();
        }
        if self.telegram.chat_id.is_none() {
            self.telegram.chat_id = std::env::var("TELEGRAM_CHAT_ID").ok();
        }
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
