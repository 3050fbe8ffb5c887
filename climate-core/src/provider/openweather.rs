use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    config::Endpoints,
    error::ProviderError,
    model::{
        Condition, Coordinates, CurrentConditions, DayPoint, DayTemperatures, HourPoint,
        LocationQuery, UnitSystem,
    },
    provider::{Geocoder, WeatherProvider, get_json, unix_to_utc},
};

const GEOCODING: &str = "OpenWeather geocoding";
const CURRENT: &str = "OpenWeather current";
const HOURLY: &str = "OpenWeather hourly";
const DAILY: &str = "OpenWeather daily";

/// OpenWeather geocoding plus the separate current/hourly/daily endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    http: Client,
    endpoints: Endpoints,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, http: Client, endpoints: Endpoints) -> Self {
        Self { api_key, http, endpoints }
    }

    fn point_query(&self, at: Coordinates, units: UnitSystem) -> [(&'static str, String); 4] {
        [
            ("lat", at.latitude.to_string()),
            ("lon", at.longitude.to_string()),
            ("units", units.as_str().to_string()),
            ("appid", self.api_key.clone()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct OwGeocodeMatch {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    #[serde(default)]
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwHourlyEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwHourlyResponse {
    list: Vec<OwHourlyEntry>,
}

#[derive(Debug, Deserialize)]
struct OwDailyTemp {
    day: f64,
    min: f64,
    max: f64,
    night: f64,
}

#[derive(Debug, Deserialize)]
struct OwDailyEntry {
    dt: i64,
    temp: OwDailyTemp,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwDailyResponse {
    list: Vec<OwDailyEntry>,
}

fn timestamp(endpoint: &'static str, dt: i64) -> Result<DateTime<Utc>, ProviderError> {
    unix_to_utc(dt).ok_or_else(|| ProviderError::Invalid {
        endpoint,
        detail: format!("timestamp {dt} is out of range"),
    })
}

fn primary_condition(weather: Vec<OwWeather>) -> Condition {
    weather
        .into_iter()
        .next()
        .map(|w| Condition { description: w.description, icon: w.icon })
        .unwrap_or_else(Condition::unknown)
}

#[async_trait]
impl Geocoder for OpenWeatherProvider {
    #[instrument(skip(self, query), fields(query = %query), level = "debug")]
    async fn geocode(
        &self,
        query: &LocationQuery,
        limit: u32,
    ) -> Result<Vec<Coordinates>, ProviderError> {
        let request = self.http.get(&self.endpoints.geocoding).query(&[
            ("q", query.as_str()),
            ("limit", &limit.to_string()),
            ("appid", self.api_key.as_str()),
        ]);

        let matches: Vec<OwGeocodeMatch> = get_json(GEOCODING, request).await?;

        Ok(matches.into_iter().map(|m| Coordinates::new(m.lat, m.lon)).collect())
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn current(
        &self,
        at: Coordinates,
        units: UnitSystem,
    ) -> Result<CurrentConditions, ProviderError> {
        let request = self.http.get(&self.endpoints.current).query(&self.point_query(at, units));
        let parsed: OwCurrentResponse = get_json(CURRENT, request).await?;

        Ok(CurrentConditions {
            temperature: parsed.main.temp,
            feels_like: parsed.main.feels_like.unwrap_or(parsed.main.temp),
            humidity_pct: parsed.main.humidity.unwrap_or_default(),
            condition: primary_condition(parsed.weather),
            observed_at: timestamp(CURRENT, parsed.dt)?,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn hourly(
        &self,
        at: Coordinates,
        units: UnitSystem,
        count: u32,
    ) -> Result<Vec<HourPoint>, ProviderError> {
        let request = self
            .http
            .get(&self.endpoints.hourly)
            .query(&self.point_query(at, units))
            .query(&[("cnt", count)]);
        let parsed: OwHourlyResponse = get_json(HOURLY, request).await?;

        parsed
            .list
            .into_iter()
            .map(|e| {
                Ok(HourPoint {
                    time: timestamp(HOURLY, e.dt)?,
                    temperature: e.main.temp,
                    condition: primary_condition(e.weather),
                })
            })
            .collect()
    }

    #[instrument(skip(self), level = "debug")]
    async fn daily(
        &self,
        at: Coordinates,
        units: UnitSystem,
        count: u32,
    ) -> Result<Vec<DayPoint>, ProviderError> {
        let request = self
            .http
            .get(&self.endpoints.daily)
            .query(&self.point_query(at, units))
            .query(&[("cnt", count)]);
        let parsed: OwDailyResponse = get_json(DAILY, request).await?;

        parsed
            .list
            .into_iter()
            .map(|e| {
                Ok(DayPoint {
                    date: timestamp(DAILY, e.dt)?,
                    temperature: DayTemperatures {
                        day: e.temp.day,
                        min: e.temp.min,
                        max: e.temp.max,
                        night: e.temp.night,
                    },
                    condition: primary_condition(e.weather),
                })
            })
            .collect()
    }
}
