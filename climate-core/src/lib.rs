//! Core library for the `daily-climate` dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstractions over the geocoding, weather and news providers
//! - The location-to-forecast pipeline (resolver, aggregator) and headline fetching
//! - Shared domain models (coordinates, snapshots, headlines)
//!
//! It is used by `climate-cli`, but can also drive other front ends.

pub mod aggregator;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod headlines;
pub mod model;
pub mod provider;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use aggregator::{ForecastAggregator, ForecastRequest, Refresh, Settled, StalePolicy};
pub use config::{ApiKeys, Config, Credentials, Endpoints};
pub use dashboard::{Dashboard, DashboardView, ForecastOutcome};
pub use error::{ProviderError, ResolveError};
pub use headlines::{HEADLINE_LIMIT, HeadlineFetcher};
pub use model::{
    Condition, Coordinates, CurrentConditions, DayPoint, DayTemperatures, ForecastSnapshot,
    Headline, HourPoint, LocationQuery, UnitSystem,
};
pub use provider::{Geocoder, NewsProvider, Providers, WeatherProvider};
pub use resolver::QueryResolver;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this twice is harmless.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
