use log::{debug, info};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::LoadError;
use crate::loader::{self, FeedbackSource};
use crate::record::FeedbackRecord;

/// A single memoised value that expires `ttl` after it was stored.
///
/// Time is passed in explicitly so callers (and tests) control the clock.
#[derive(Debug)]
pub struct TtlCache<T> {
    entry: Option<(T, Instant)>,
    ttl: Duration,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache { entry: None, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// True when nothing is cached or the cached value is at least `ttl` old.
    pub fn is_stale(&self, now: Instant) -> bool {
        match &self.entry {
            Some((_, fetched_at)) => now.saturating_duration_since(*fetched_at) >= self.ttl,
            None => true,
        }
    }

    /// The cached value, if it is still fresh at `now`.
    pub fn get(&self, now: Instant) -> Option<&T> {
        if self.is_stale(now) {
            None
        } else {
            self.entry.as_ref().map(|(value, _)| value)
        }
    }

    pub fn store(&mut self, value: T, now: Instant) {
        self.entry = Some((value, now));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Runs `fetch` only if the value is missing or expired, then returns the
    /// fresh value.
    ///
    /// A failed fetch clears the cache and returns the error; an expired value
    /// is never served in its place.
    pub async fn refresh_if_stale<F, Fut, E>(&mut self, now: Instant, fetch: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let entry = match self.entry.take() {
            Some((value, fetched_at)) if now.saturating_duration_since(fetched_at) < self.ttl => {
                (value, fetched_at)
            }
            _ => (fetch().await?, now),
        };
        Ok(&self.entry.insert(entry).0)
    }
}

/// Owns a data source and the memoised records it produced.
pub struct CachedLoader {
    source: Box<dyn FeedbackSource>,
    cache: TtlCache<Arc<Vec<FeedbackRecord>>>,
}

impl CachedLoader {
    pub fn new(source: Box<dyn FeedbackSource>, ttl: Duration) -> Self {
        CachedLoader {
            source,
            cache: TtlCache::new(ttl),
        }
    }

    /// Returns the cached records, fetching them first if the cache is stale.
    pub async fn load(&mut self) -> Result<Arc<Vec<FeedbackRecord>>, LoadError> {
        self.load_at(Instant::now()).await
    }

    pub async fn load_at(&mut self, now: Instant) -> Result<Arc<Vec<FeedbackRecord>>, LoadError> {
        if !self.cache.is_stale(now) {
            debug!("serving feedback records from cache");
        }
        let source = self.source.as_ref();
        let records = self
            .cache
            .refresh_if_stale(now, || async move {
                let started = Instant::now();
                let records = loader::load(source).await?;
                info!(
                    "loaded {} feedback records from {} in {:?}",
                    records.len(),
                    source.describe(),
                    started.elapsed()
                );
                Ok::<_, LoadError>(Arc::new(records))
            })
            .await?;
        Ok(Arc::clone(records))
    }

    /// Drops the cached records so the next `load` fetches again.
    pub fn invalidate(&mut self) {
        info!("feedback cache invalidated");
        self.cache.invalidate();
    }

    pub fn ttl(&self) -> Duration {
        self.cache.ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_once_within_ttl() {
        let mut cache = TtlCache::new(Duration::from_secs(3600));
        let start = Instant::now();
        let mut calls = 0;

        let value = cache
            .refresh_if_stale(start, || {
                calls += 1;
                async { Ok::<_, ()>(1) }
            })
            .await
            .unwrap();
        assert_eq!(*value, 1);

        let later = start + Duration::from_secs(3599);
        let value = cache
            .refresh_if_stale(later, || {
                calls += 1;
                async { Ok::<_, ()>(2) }
            })
            .await
            .unwrap();
        assert_eq!(*value, 1);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn refetches_after_expiry() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        let start = Instant::now();
        cache.store("old", start);
        assert!(!cache.is_stale(start + Duration::from_secs(59)));

        let expired = start + Duration::from_secs(60);
        assert!(cache.get(expired).is_none());
        let value = cache
            .refresh_if_stale(expired, || async { Ok::<_, ()>("new") })
            .await
            .unwrap();
        assert_eq!(*value, "new");
    }

    #[tokio::test]
    async fn failed_refresh_does_not_serve_stale_value() {
        let mut cache = TtlCache::new(Duration::from_secs(1));
        let start = Instant::now();
        cache.store(7, start);

        let result = cache
            .refresh_if_stale(start + Duration::from_secs(5), || async { Err::<i32, _>("down") })
            .await;
        assert_eq!(result, Err("down"));
        assert!(cache.get(start + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn invalidate_marks_stale() {
        let mut cache = TtlCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.store(1, now);
        assert_eq!(cache.get(now), Some(&1));
        cache.invalidate();
        assert!(cache.is_stale(now));
    }
}
