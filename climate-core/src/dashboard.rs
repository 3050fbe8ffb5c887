//! Wires the resolver, aggregator and headline fetcher together.
//!
//! The dashboard is the only place that logs pipeline failures. Components
//! return typed results; here they are turned into log lines and the
//! affected state is left as it was.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    aggregator::{ForecastAggregator, ForecastRequest, Settled},
    config::Config,
    error::ResolveError,
    headlines::HeadlineFetcher,
    model::{Coordinates, ForecastSnapshot, Headline},
    provider::{Providers, providers_from_config},
    resolver::QueryResolver,
};

/// Consistent read of everything a renderer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub busy: bool,
    pub coordinates: Option<Coordinates>,
    pub forecast: Option<Arc<ForecastSnapshot>>,
    pub headlines: Vec<Headline>,
}

/// What happened to the forecast after a successful [`Dashboard::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastOutcome {
    /// The forecast for the searched place was published.
    Updated,
    /// The aggregation for the searched place failed or was discarded.
    Unchanged,
    /// Nothing for the searched place finished within the wait.
    Pending,
}

#[derive(Debug)]
pub struct Dashboard {
    resolver: QueryResolver,
    aggregator: Arc<ForecastAggregator>,
    headlines: HeadlineFetcher,
    headline_list: Arc<watch::Sender<Vec<Headline>>>,
    started: AtomicBool,
}

impl Dashboard {
    pub fn new(providers: Providers, request: ForecastRequest) -> Self {
        Self {
            resolver: QueryResolver::new(providers.geocoder),
            aggregator: Arc::new(ForecastAggregator::new(providers.weather, request)),
            headlines: HeadlineFetcher::new(providers.news),
            headline_list: Arc::new(watch::Sender::new(Vec::new())),
            started: AtomicBool::new(false),
        }
    }

    /// Build providers from config. Fails if either API key is missing or a
    /// setting is out of range.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let providers = providers_from_config(config)?;
        Ok(Self::new(providers, ForecastRequest::from(config)))
    }

    /// Subscribe the aggregator to coordinates and fetch headlines once.
    ///
    /// Returns the headline task, or `None` if the dashboard was already started.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("dashboard already started");
            return None;
        }

        tokio::spawn(Arc::clone(&self.aggregator).follow(self.resolver.subscribe()));

        let fetcher = self.headlines.clone();
        let list = Arc::clone(&self.headline_list);
        Some(tokio::spawn(async move {
            match fetcher.fetch().await {
                Ok(headlines) => {
                    info!(count = headlines.len(), "headlines loaded");
                    list.send_replace(headlines);
                }
                Err(e) => warn!(error = %e, "failed to fetch headlines"),
            }
        }))
    }

    /// Resolve `raw` and publish the coordinates. Never fails; problems are logged.
    pub async fn submit(&self, raw: &str) -> Option<Coordinates> {
        self.try_submit(raw).await.ok()
    }

    /// Like [`Dashboard::submit`], but hands the error back after logging it.
    pub async fn try_submit(&self, raw: &str) -> Result<Coordinates, ResolveError> {
        let result = self.resolver.resolve(raw).await;

        match &result {
            Ok(coords) => info!(
                query = raw.trim(),
                latitude = coords.latitude,
                longitude = coords.longitude,
                "location resolved"
            ),
            Err(ResolveError::EmptyQuery) => debug!("ignoring empty location query"),
            Err(e @ ResolveError::NotFound { .. }) => info!(error = %e, "location not found"),
            Err(e @ ResolveError::Provider(_)) => {
                warn!(query = raw.trim(), error = %e, "error fetching geolocation")
            }
        }

        result
    }

    /// Submit `raw` and wait up to `wait` for the aggregation of the resolved
    /// place to finish.
    ///
    /// Aggregations for other places that finish in the meantime are ignored.
    /// Requires [`Dashboard::start`] to have been called.
    pub async fn search(&self, raw: &str, wait: Duration) -> Result<ForecastOutcome, ResolveError> {
        let mut settled = self.aggregator.settled();
        let before = settled.borrow_and_update().count;

        let coords = self.try_submit(raw).await?;

        let finished = timeout(
            wait,
            settled.wait_for(|s: &Settled| s.count > before && s.last == Some(coords)),
        )
        .await;

        Ok(match finished {
            Ok(Ok(s)) if s.applied => ForecastOutcome::Updated,
            Ok(_) => ForecastOutcome::Unchanged,
            Err(_) => {
                debug!(
                    latitude = coords.latitude,
                    longitude = coords.longitude,
                    "forecast still pending"
                );
                ForecastOutcome::Pending
            }
        })
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            busy: self.resolver.is_busy(),
            coordinates: self.resolver.coordinates(),
            forecast: self.aggregator.snapshot(),
            headlines: self.headline_list.borrow().clone(),
        }
    }

    pub fn coordinates(&self) -> watch::Receiver<Option<Coordinates>> {
        self.resolver.subscribe()
    }

    pub fn busy(&self) -> watch::Receiver<bool> {
        self.resolver.busy()
    }

    pub fn forecast(&self) -> watch::Receiver<Option<Arc<ForecastSnapshot>>> {
        self.aggregator.subscribe()
    }

    pub fn forecast_settled(&self) -> watch::Receiver<Settled> {
        self.aggregator.settled()
    }

    pub fn headlines(&self) -> watch::Receiver<Vec<Headline>> {
        self.headline_list.subscribe()
    }
}
