use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ResolveError;

/// Free-text place description, guaranteed non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery(String);

impl LocationQuery {
    /// Trim the raw input and reject it when nothing is left.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Latitude: {}, Longitude: {}", self.latitude, self.longitude)
    }
}

/// Unit system sent to the weather provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "imperial",
            UnitSystem::Metric => "metric",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            UnitSystem::Imperial => "°F",
            UnitSystem::Metric => "°C",
        }
    }

    pub const fn all() -> &'static [UnitSystem] {
        &[UnitSystem::Imperial, UnitSystem::Metric]
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UnitSystem {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "imperial" => Ok(UnitSystem::Imperial),
            "metric" => Ok(UnitSystem::Metric),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported unit systems: imperial, metric."
            )),
        }
    }
}

/// Primary condition descriptor of a weather point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub description: String,
    /// Provider icon code, e.g. `10d`.
    pub icon: String,
}

impl Condition {
    pub fn unknown() -> Self {
        Self { description: "Unknown".to_string(), icon: String::new() }
    }

    /// Image URL for the icon, if the provider supplied one.
    pub fn icon_url(&self) -> Option<String> {
        if self.icon.is_empty() {
            return None;
        }
        Some(format!("http://openweathermap.org/img/wn/{}@2x.png", self.icon))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub condition: Condition,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourPoint {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayTemperatures {
    pub day: f64,
    pub min: f64,
    pub max: f64,
    pub night: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPoint {
    pub date: DateTime<Utc>,
    pub temperature: DayTemperatures,
    pub condition: Condition,
}

/// Current, hourly and daily weather for one set of coordinates.
///
/// Always complete: the aggregator never publishes a snapshot built from a
/// partial set of provider responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    pub coordinates: Coordinates,
    pub units: UnitSystem,
    pub current: CurrentConditions,
    /// Chronological, provider order.
    pub hourly: Vec<HourPoint>,
    /// Chronological, provider order.
    pub daily: Vec<DayPoint>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub byline: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub url: String,
    /// First multimedia entry of the article, if any.
    pub media_url: Option<String>,
}
