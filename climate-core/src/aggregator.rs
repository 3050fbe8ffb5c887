//! Coordinates to a complete forecast snapshot.
//!
//! Every coordinates value published by the resolver starts one aggregation.
//! Aggregations are never cancelled, so two of them can be in flight at once.
//! With [`StalePolicy::LastWriterWins`] whichever finishes last owns the
//! snapshot, even if it was started first. [`StalePolicy::LatestRequestWins`]
//! tags each aggregation with a generation and drops completions that have
//! been overtaken by a newer request.

use chrono::Utc;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::ProviderError,
    model::{Coordinates, ForecastSnapshot, UnitSystem},
    provider::WeatherProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    #[default]
    LastWriterWins,
    LatestRequestWins,
}

/// What the aggregator asks the provider for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastRequest {
    pub units: UnitSystem,
    pub hourly_points: u32,
    pub daily_points: u32,
    pub policy: StalePolicy,
}

impl Default for ForecastRequest {
    fn default() -> Self {
        Self {
            units: UnitSystem::default(),
            hourly_points: 24,
            daily_points: 7,
            policy: StalePolicy::default(),
        }
    }
}

impl From<&Config> for ForecastRequest {
    fn from(config: &Config) -> Self {
        Self {
            units: config.units,
            hourly_points: config.forecast.hourly_points,
            daily_points: config.forecast.daily_points,
            policy: if config.forecast.discard_stale {
                StalePolicy::LatestRequestWins
            } else {
                StalePolicy::LastWriterWins
            },
        }
    }
}

/// Outcome of a successful aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    Applied(Arc<ForecastSnapshot>),
    /// A newer aggregation was started while this one ran.
    Discarded,
}

/// Record of the most recently finished aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Settled {
    /// Aggregations finished so far, whether applied, discarded or failed.
    pub count: u64,
    pub last: Option<Coordinates>,
    /// Whether the last one replaced the published snapshot.
    pub applied: bool,
}

#[derive(Debug)]
pub struct ForecastAggregator {
    weather: Arc<dyn WeatherProvider>,
    request: ForecastRequest,
    snapshot: watch::Sender<Option<Arc<ForecastSnapshot>>>,
    settled: watch::Sender<Settled>,
    generation: AtomicU64,
}

impl ForecastAggregator {
    pub fn new(weather: Arc<dyn WeatherProvider>, request: ForecastRequest) -> Self {
        Self {
            weather,
            request,
            snapshot: watch::Sender::new(None),
            settled: watch::Sender::new(Settled::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Fetch all three series. Fails as a whole if any one of them fails.
    pub async fn aggregate(&self, coords: Coordinates) -> Result<ForecastSnapshot, ProviderError> {
        let ForecastRequest { units, hourly_points, daily_points, .. } = self.request;

        let (current, hourly, daily) = tokio::try_join!(
            self.weather.current(coords, units),
            self.weather.hourly(coords, units, hourly_points),
            self.weather.daily(coords, units, daily_points),
        )?;

        Ok(ForecastSnapshot {
            coordinates: coords,
            units,
            current,
            hourly,
            daily,
            fetched_at: Utc::now(),
        })
    }

    /// Aggregate and, on success, replace the published snapshot.
    ///
    /// On failure the previous snapshot stays published untouched. The
    /// generation is taken when this is called, not when the future is first
    /// polled, so request order is the order of the calls.
    pub fn refresh(
        &self,
        coords: Coordinates,
    ) -> impl Future<Output = Result<Refresh, ProviderError>> + Send + '_ {
        let ticket = self.next_generation();
        self.refresh_with(coords, ticket)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn refresh_with(
        &self,
        coords: Coordinates,
        ticket: u64,
    ) -> Result<Refresh, ProviderError> {
        let outcome = self.aggregate(coords).await.map(|snapshot| {
            if self.request.policy == StalePolicy::LatestRequestWins
                && self.generation.load(Ordering::SeqCst) != ticket
            {
                return Refresh::Discarded;
            }

            let snapshot = Arc::new(snapshot);
            self.snapshot.send_replace(Some(snapshot.clone()));
            Refresh::Applied(snapshot)
        });

        let applied = matches!(outcome, Ok(Refresh::Applied(_)));
        self.settled.send_modify(|s| {
            s.count += 1;
            s.last = Some(coords);
            s.applied = applied;
        });
        outcome
    }

    /// Spawn one aggregation per coordinates value seen on `coordinates`.
    ///
    /// Returns when the publishing side is dropped. Failures are logged here.
    pub async fn follow(self: Arc<Self>, mut coordinates: watch::Receiver<Option<Coordinates>>) {
        while coordinates.changed().await.is_ok() {
            let latest = *coordinates.borrow_and_update();
            let Some(coords) = latest else {
                continue;
            };

            let ticket = self.next_generation();
            let aggregator = Arc::clone(&self);
            tokio::spawn(async move {
                match aggregator.refresh_with(coords, ticket).await {
                    Ok(Refresh::Applied(snapshot)) => info!(
                        latitude = coords.latitude,
                        longitude = coords.longitude,
                        hourly = snapshot.hourly.len(),
                        daily = snapshot.daily.len(),
                        "forecast updated"
                    ),
                    Ok(Refresh::Discarded) => debug!(
                        latitude = coords.latitude,
                        longitude = coords.longitude,
                        "stale forecast discarded"
                    ),
                    Err(e) => warn!(
                        latitude = coords.latitude,
                        longitude = coords.longitude,
                        error = %e,
                        "forecast unavailable, keeping previous snapshot"
                    ),
                }
            });
        }
        debug!("coordinates publisher closed, forecast subscription ended");
    }

    pub fn snapshot(&self) -> Option<Arc<ForecastSnapshot>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ForecastSnapshot>>> {
        self.snapshot.subscribe()
    }

    /// Updated once per finished aggregation, whether it was applied, discarded or failed.
    pub fn settled(&self) -> watch::Receiver<Settled> {
        self.settled.subscribe()
    }
}
