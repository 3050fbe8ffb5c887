use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::UnitSystem;

pub const WEATHER_KEY_ENV: &str = "WEATHER_API_KEY";
pub const NEWS_KEY_ENV: &str = "NEWS_API_KEY";

/// The dashboard always shows at least a day of hours and a week of days.
pub const MIN_HOURLY_POINTS: u32 = 24;
pub const MIN_DAILY_POINTS: u32 = 7;

/// Older deployments exported the keys with a bundler prefix.
const LEGACY_WEATHER_KEY_ENV: &str = "VITE_WEATHER_API_KEY";
const LEGACY_NEWS_KEY_ENV: &str = "VITE_NEWS_API_KEY";

/// API keys as stored on disk. Either may be missing until `configure` runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Credentials {
    pub weather_api_key: Option<String>,
    pub news_api_key: Option<String>,
}

/// Both keys, validated present. Handed to the providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeys {
    pub weather: String,
    pub news: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub hourly_points: u32,
    pub daily_points: u32,
    /// Drop aggregations that finish after a newer one was started.
    pub discard_stale: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { hourly_points: 24, daily_points: 7, discard_stale: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Provider URLs. Overridable so the dashboard can be pointed at a proxy or a mock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub geocoding: String,
    pub current: String,
    pub hourly: String,
    pub daily: String,
    pub news: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocoding: "https://api.openweathermap.org/geo/1.0/direct".to_string(),
            current: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            hourly: "https://pro.openweathermap.org/data/2.5/forecast/hourly".to_string(),
            daily: "https://api.openweathermap.org/data/2.5/forecast/daily".to_string(),
            news: "https://api.nytimes.com/svc/topstories/v2/home.json".to_string(),
        }
    }
}

impl Endpoints {
    /// Every endpoint rooted at `base`, keeping the provider paths. Used with mock servers.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            geocoding: format!("{base}/geo/1.0/direct"),
            current: format!("{base}/data/2.5/weather"),
            hourly: format!("{base}/data/2.5/forecast/hourly"),
            daily: format!("{base}/data/2.5/forecast/daily"),
            news: format!("{base}/svc/topstories/v2/home.json"),
        }
    }
}

/// Top-level configuration.
///
/// Example TOML:
/// ```toml
/// units = "metric"
///
/// [credentials]
/// weather_api_key = "..."
/// news_api_key = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub units: UnitSystem,

    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load from disk, then let the process environment override the credentials.
    pub fn load_with_env() -> Result<Self> {
        let mut cfg = Self::load()?;
        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(contents).context("Invalid configuration TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the dashboard cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.forecast.hourly_points < MIN_HOURLY_POINTS {
            return Err(anyhow!(
                "forecast.hourly_points must be at least {MIN_HOURLY_POINTS}, got {}",
                self.forecast.hourly_points
            ));
        }
        if self.forecast.daily_points < MIN_DAILY_POINTS {
            return Err(anyhow!(
                "forecast.daily_points must be at least {MIN_DAILY_POINTS}, got {}",
                self.forecast.daily_points
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(anyhow!("http.timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "daily-climate", "daily-climate")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override stored credentials with environment values.
    ///
    /// `lookup` is `std::env::var` in production; blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |primary: &str, legacy: &str| {
            [primary, legacy]
                .into_iter()
                .filter_map(&lookup)
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        if let Some(key) = read(WEATHER_KEY_ENV, LEGACY_WEATHER_KEY_ENV) {
            self.credentials.weather_api_key = Some(key);
        }
        if let Some(key) = read(NEWS_KEY_ENV, LEGACY_NEWS_KEY_ENV) {
            self.credentials.news_api_key = Some(key);
        }
    }

    /// Both API keys, or an error naming the first one that is missing.
    pub fn api_keys(&self) -> Result<ApiKeys> {
        let weather = Self::require(&self.credentials.weather_api_key, WEATHER_KEY_ENV, "weather")?;
        let news = Self::require(&self.credentials.news_api_key, NEWS_KEY_ENV, "news")?;

        Ok(ApiKeys { weather, news })
    }

    fn require(value: &Option<String>, env: &str, what: &str) -> Result<String> {
        value.as_deref().filter(|v| !v.trim().is_empty()).map(str::to_owned).ok_or_else(|| {
            anyhow!(
                "No {what} API key configured.\n\
                 Hint: export {env}=<key> or run `daily-climate configure`."
            )
        })
    }

    pub fn set_weather_api_key(&mut self, api_key: String) {
        self.credentials.weather_api_key = Some(api_key);
    }

    pub fn set_news_api_key(&mut self, api_key: String) {
        self.credentials.news_api_key = Some(api_key);
    }

    pub fn set_units(&mut self, units: UnitSystem) {
        self.units = units;
    }
}
