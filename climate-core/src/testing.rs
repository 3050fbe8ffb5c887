//! In-process provider fakes for pipeline tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use crate::{
    error::ProviderError,
    model::{
        Condition, Coordinates, CurrentConditions, DayPoint, DayTemperatures, Headline, HourPoint,
        LocationQuery, UnitSystem,
    },
    provider::{Geocoder, NewsProvider, WeatherProvider},
};

fn unavailable(endpoint: &'static str) -> ProviderError {
    ProviderError::Status {
        endpoint,
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "unavailable".to_string(),
    }
}

fn at(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

fn clear() -> Condition {
    Condition { description: "clear sky".into(), icon: "01d".into() }
}

#[derive(Debug, Default)]
pub struct FakeGeocoder {
    matches: Mutex<Vec<Coordinates>>,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn returning(matches: Vec<Coordinates>) -> Self {
        Self { matches: Mutex::new(matches), ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { fail: AtomicBool::new(true), ..Self::default() }
    }

    pub fn set_matches(&self, matches: Vec<Coordinates>) {
        *self.matches.lock().unwrap() = matches;
        self.fail.store(false, Ordering::SeqCst);
    }

    pub fn set_failing(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(
        &self,
        _query: &LocationQuery,
        limit: u32,
    ) -> Result<Vec<Coordinates>, ProviderError> {
        assert_eq!(limit, 1, "resolver must ask for a single match");
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("fake geocoding"));
        }
        Ok(self.matches.lock().unwrap().clone())
    }
}

/// Weather fake. Series lengths follow the requested counts; the current
/// temperature is fixed. Per-location delays make completion order controllable.
#[derive(Debug)]
pub struct FakeWeather {
    current_temp: f64,
    fail_hourly: AtomicBool,
    fail_current: AtomicBool,
    delays: Mutex<Vec<(Coordinates, Duration)>>,
    calls: AtomicUsize,
}

impl Default for FakeWeather {
    fn default() -> Self {
        Self {
            current_temp: 72.0,
            fail_hourly: AtomicBool::new(false),
            fail_current: AtomicBool::new(false),
            delays: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeWeather {
    pub fn set_fail_hourly(&self, fail: bool) {
        self.fail_hourly.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_current(&self, fail: bool) {
        self.fail_current.store(fail, Ordering::SeqCst);
    }

    pub fn delay_for(&self, coords: Coordinates, delay: Duration) {
        self.delays.lock().unwrap().push((coords, delay));
    }

    /// Number of series requests issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pause(&self, coords: Coordinates) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay =
            self.delays.lock().unwrap().iter().find(|(c, _)| *c == coords).map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn current(
        &self,
        at_coords: Coordinates,
        _units: UnitSystem,
    ) -> Result<CurrentConditions, ProviderError> {
        self.pause(at_coords).await;
        if self.fail_current.load(Ordering::SeqCst) {
            return Err(unavailable("fake current"));
        }

        Ok(CurrentConditions {
            temperature: self.current_temp,
            feels_like: self.current_temp,
            humidity_pct: 50,
            condition: clear(),
            observed_at: at(1_700_000_000),
        })
    }

    async fn hourly(
        &self,
        at_coords: Coordinates,
        _units: UnitSystem,
        count: u32,
    ) -> Result<Vec<HourPoint>, ProviderError> {
        self.pause(at_coords).await;
        if self.fail_hourly.load(Ordering::SeqCst) {
            return Err(unavailable("fake hourly"));
        }

        Ok((0..i64::from(count))
            .map(|i| HourPoint {
                time: at(1_700_000_000 + i * 3600),
                temperature: 60.0 + i as f64,
                condition: clear(),
            })
            .collect())
    }

    async fn daily(
        &self,
        at_coords: Coordinates,
        _units: UnitSystem,
        count: u32,
    ) -> Result<Vec<DayPoint>, ProviderError> {
        self.pause(at_coords).await;

        Ok((0..i64::from(count))
            .map(|i| DayPoint {
                date: at(1_700_000_000 + i * 86_400),
                temperature: DayTemperatures {
                    day: 70.0 + i as f64,
                    min: 55.0,
                    max: 75.0,
                    night: 58.0,
                },
                condition: clear(),
            })
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct FakeNews {
    count: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeNews {
    pub fn with_stories(count: usize) -> Self {
        Self { count, ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsProvider for FakeNews {
    async fn top_stories(&self) -> Result<Vec<Headline>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(unavailable("fake news"));
        }

        Ok((0..self.count)
            .map(|i| Headline {
                title: format!("Story {i}"),
                byline: "By Staff".to_string(),
                summary: format!("Summary {i}"),
                url: format!("https://example.com/{i}"),
                media_url: None,
            })
            .collect())
    }
}
