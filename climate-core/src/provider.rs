use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::{fmt::Debug, sync::Arc, time::Duration};

use crate::{
    config::Config,
    error::ProviderError,
    model::{
        Coordinates, CurrentConditions, DayPoint, Headline, HourPoint, LocationQuery, UnitSystem,
    },
    provider::{nytimes::NyTimesProvider, openweather::OpenWeatherProvider},
};

pub mod nytimes;
pub mod openweather;

/// Free-text place lookup.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Matches in provider order, at most `limit` of them.
    async fn geocode(
        &self,
        query: &LocationQuery,
        limit: u32,
    ) -> Result<Vec<Coordinates>, ProviderError>;
}

/// Weather for a point, one call per series.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(
        &self,
        at: Coordinates,
        units: UnitSystem,
    ) -> Result<CurrentConditions, ProviderError>;

    async fn hourly(
        &self,
        at: Coordinates,
        units: UnitSystem,
        count: u32,
    ) -> Result<Vec<HourPoint>, ProviderError>;

    async fn daily(
        &self,
        at: Coordinates,
        units: UnitSystem,
        count: u32,
    ) -> Result<Vec<DayPoint>, ProviderError>;
}

#[async_trait]
pub trait NewsProvider: Send + Sync + Debug {
    /// Top stories in provider order, untruncated.
    async fn top_stories(&self) -> Result<Vec<Headline>, ProviderError>;
}

/// The three providers the dashboard talks to.
#[derive(Debug, Clone)]
pub struct Providers {
    pub geocoder: Arc<dyn Geocoder>,
    pub weather: Arc<dyn WeatherProvider>,
    pub news: Arc<dyn NewsProvider>,
}

/// Construct the providers from config. Fails fast when a key is missing.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Providers> {
    let keys = config.api_keys()?;
    let http = http_client(config.http.timeout())?;

    let openweather =
        Arc::new(OpenWeatherProvider::new(keys.weather, http.clone(), config.endpoints.clone()));
    let news = Arc::new(NyTimesProvider::new(keys.news, http, config.endpoints.news.clone()));

    Ok(Providers { geocoder: openweather.clone(), weather: openweather, news })
}

/// Shared HTTP client. Every request gets `timeout`.
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("daily-climate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))
}

/// Send a prepared GET and decode the JSON body, mapping each failure stage.
pub(crate) async fn get_json<T: DeserializeOwned>(
    endpoint: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let res = request.send().await.map_err(|source| ProviderError::Transport { endpoint, source })?;

    let status = res.status();
    let body = res.text().await.map_err(|source| ProviderError::Transport { endpoint, source })?;

    if !status.is_success() {
        return Err(ProviderError::Status { endpoint, status, body: truncate_body(&body) });
    }

    serde_json::from_str(&body).map_err(|source| ProviderError::Parse { endpoint, source })
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
