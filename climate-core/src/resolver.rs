//! Free-text location query to a single coordinate pair.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::watch;
use tracing::debug;

use crate::{
    error::ResolveError,
    model::{Coordinates, LocationQuery},
    provider::Geocoder,
};

/// Only the best match is ever used.
pub const GEOCODE_LIMIT: u32 = 1;

/// Resolves queries and publishes the resulting coordinates.
///
/// Coordinates are only ever replaced by a successful lookup. Empty queries,
/// empty result sets and provider failures all leave the last value in place.
#[derive(Debug)]
pub struct QueryResolver {
    geocoder: Arc<dyn Geocoder>,
    coordinates: watch::Sender<Option<Coordinates>>,
    busy: watch::Sender<bool>,
    in_flight: AtomicUsize,
}

impl QueryResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            coordinates: watch::Sender::new(None),
            busy: watch::Sender::new(false),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub async fn resolve(&self, raw: &str) -> Result<Coordinates, ResolveError> {
        let query = LocationQuery::parse(raw)?;

        let _busy = BusyGuard::engage(self);
        debug!(query = %query, "geocoding");

        let matches = self.geocoder.geocode(&query, GEOCODE_LIMIT).await?;
        let first = matches
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NotFound { query: query.to_string() })?;

        self.coordinates.send_replace(Some(first));
        Ok(first)
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        *self.coordinates.borrow()
    }

    /// Receiver that sees every coordinates value published after this call.
    pub fn subscribe(&self) -> watch::Receiver<Option<Coordinates>> {
        self.coordinates.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    pub fn busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }
}

/// Holds the busy flag up while at least one resolution is running.
struct BusyGuard<'a> {
    resolver: &'a QueryResolver,
}

impl<'a> BusyGuard<'a> {
    fn engage(resolver: &'a QueryResolver) -> Self {
        if resolver.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            resolver.busy.send_replace(true);
        }
        Self { resolver }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.resolver.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.resolver.busy.send_replace(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGeocoder;
    use std::time::Duration;

    fn nyc() -> Coordinates {
        Coordinates::new(40.7128, -74.006)
    }

    fn resolver(geocoder: &Arc<FakeGeocoder>) -> QueryResolver {
        QueryResolver::new(geocoder.clone())
    }

    #[tokio::test]
    async fn blank_query_issues_no_call() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![nyc()]));
        let resolver = resolver(&geocoder);
        let mut busy = resolver.busy();

        for raw in ["", "   ", "\n\t "] {
            let err = resolver.resolve(raw).await.unwrap_err();
            assert!(matches!(err, ResolveError::EmptyQuery));
        }

        assert_eq!(geocoder.calls(), 0);
        assert_eq!(resolver.coordinates(), None);
        assert!(!busy.has_changed().unwrap());
    }

    #[tokio::test]
    async fn blank_query_keeps_previous_coordinates() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![nyc()]));
        let resolver = resolver(&geocoder);
        resolver.resolve("New York").await.unwrap();

        resolver.resolve("  ").await.unwrap_err();

        assert_eq!(resolver.coordinates(), Some(nyc()));
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn first_match_wins() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![
            nyc(),
            Coordinates::new(51.5072, -0.1276),
            Coordinates::new(48.8566, 2.3522),
        ]));
        let resolver = resolver(&geocoder);

        let coords = resolver.resolve("somewhere").await.unwrap();

        assert_eq!(coords, nyc());
        assert_eq!(resolver.coordinates(), Some(nyc()));
    }

    #[tokio::test]
    async fn no_match_keeps_previous_coordinates() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![nyc()]));
        let resolver = resolver(&geocoder);
        resolver.resolve("New York").await.unwrap();

        geocoder.set_matches(vec![]);
        let err = resolver.resolve("Atlantis").await.unwrap_err();

        assert!(matches!(err, ResolveError::NotFound { ref query } if query == "Atlantis"));
        assert_eq!(resolver.coordinates(), Some(nyc()));
    }

    #[tokio::test]
    async fn no_match_on_first_lookup_stays_unset() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![]));
        let resolver = resolver(&geocoder);

        resolver.resolve("Atlantis").await.unwrap_err();

        assert_eq!(resolver.coordinates(), None);
    }

    #[tokio::test]
    async fn provider_failure_keeps_previous_coordinates_and_clears_busy() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![nyc()]));
        let resolver = resolver(&geocoder);
        resolver.resolve("New York").await.unwrap();

        geocoder.set_failing();
        let err = resolver.resolve("London").await.unwrap_err();

        assert!(matches!(err, ResolveError::Provider(_)));
        assert_eq!(resolver.coordinates(), Some(nyc()));
        assert!(!resolver.is_busy());
    }

    #[tokio::test]
    async fn failing_first_lookup_leaves_state_untouched() {
        let geocoder = Arc::new(FakeGeocoder::failing());
        let resolver = resolver(&geocoder);
        let mut rx = resolver.subscribe();

        let err = resolver.resolve("New York").await.unwrap_err();

        assert!(matches!(err, ResolveError::Provider(ref e) if e.endpoint() == "fake geocoding"));
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(resolver.coordinates(), None);
        assert!(!rx.has_changed().unwrap());
        assert!(!resolver.is_busy());
    }

    #[tokio::test]
    async fn success_notifies_subscribers() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![nyc()]));
        let resolver = resolver(&geocoder);
        let mut rx = resolver.subscribe();

        resolver.resolve("New York").await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(nyc()));
    }

    #[tokio::test(start_paused = true)]
    async fn busy_while_lookup_in_flight() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![nyc()]));
        geocoder.set_delay(Duration::from_secs(2));
        let resolver = Arc::new(resolver(&geocoder));

        let task = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.resolve("New York").await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(resolver.is_busy());

        task.await.unwrap().unwrap();
        assert!(!resolver.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_lookups_keep_busy_until_last_finishes() {
        let geocoder = Arc::new(FakeGeocoder::returning(vec![nyc()]));
        geocoder.set_delay(Duration::from_secs(2));
        let resolver = Arc::new(resolver(&geocoder));

        let first = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.resolve("New York").await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        let second = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.resolve("New York").await }
        });

        first.await.unwrap().unwrap();
        assert!(resolver.is_busy());

        second.await.unwrap().unwrap();
        assert!(!resolver.is_busy());
    }
}
