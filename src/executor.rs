//! Concurrent range-query fanout over a set of bounds.

use crate::error::{NearbyError, Result};
use crate::geokey::Bound;
use crate::store::{Document, RangeQuery, RangeStore};
use futures::future::try_join_all;

/// Raw rows returned for one bound.
#[derive(Debug, Clone)]
pub struct BoundRows {
    pub bound: Bound,
    pub rows: Vec<Document>,
}

/// Issue one range query per bound, all at once, and wait for every one.
///
/// `base` carries the collection, the pushed-down filters and the ordering
/// field; each bound only sets the inclusive `[low, high]` range. Results come
/// back partitioned per bound, in bound order. If any query fails, the others
/// are dropped and the whole fetch fails: a missing bound would silently
/// under-cover the search disc.
pub async fn fetch_bounds<S: RangeStore>(
    store: &S,
    base: &RangeQuery,
    bounds: &[Bound],
) -> Result<Vec<BoundRows>> {
    let fetches = bounds.iter().map(|bound| {
        let query = base
            .clone()
            .start_at(bound.low.as_str())
            .end_at(bound.high.as_str());
        async move {
            let rows = store
                .range_query(&query)
                .await
                .map_err(|e| classify(bound, e))?;
            log::trace!("bound {} returned {} row(s)", bound, rows.len());
            Ok::<_, NearbyError>(BoundRows {
                bound: bound.clone(),
                rows,
            })
        }
    });

    try_join_all(fetches).await
}

/// Every failure reaching the executor is a storage failure; keep timeouts
/// distinguishable and name the bound that failed.
fn classify(bound: &Bound, error: NearbyError) -> NearbyError {
    log::warn!("range query for bound {} failed: {}", bound, error);
    match error {
        NearbyError::Timeout(after) => NearbyError::Timeout(after),
        NearbyError::Storage(message) => {
            NearbyError::Storage(format!("bound {}: {}", bound, message))
        }
        other => NearbyError::Storage(format!("bound {}: {}", bound, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, hash) in [("a", "d6n0"), ("b", "d6p1"), ("c", "d6q2"), ("d", "e000")] {
            store.insert(
                "businesses",
                Document::from_value(id, json!({ "geohash": hash, "state": true })).unwrap(),
            );
        }
        store
    }

    fn base() -> RangeQuery {
        RangeQuery::new("businesses").order_by("geohash")
    }

    #[tokio::test]
    async fn test_rows_partitioned_per_bound() {
        let store = seeded_store();
        let bounds = vec![Bound::new("d6n", "d6p"), Bound::new("d6q", "d6r")];

        let fetched = fetch_bounds(&store, &base(), &bounds).await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].bound, bounds[0]);
        assert_eq!(fetched[0].rows.len(), 1);
        assert_eq!(fetched[0].rows[0].id, "a");
        assert_eq!(fetched[1].rows[0].id, "c");
        assert_eq!(store.stats().range_queries, 2);
    }

    #[tokio::test]
    async fn test_overlapping_bounds_return_duplicates() {
        let store = seeded_store();
        let bounds = vec![Bound::new("d6n", "d6p1"), Bound::new("d6p1", "d6r")];

        let fetched = fetch_bounds(&store, &base(), &bounds).await.unwrap();
        let total: usize = fetched.iter().map(|b| b.rows.len()).sum();
        // "b" sits on the shared edge and comes back twice
        assert_eq!(total, 4);
    }

    struct FailingStore {
        calls: AtomicUsize,
        fail_on: &'static str,
    }

    impl RangeStore for FailingStore {
        async fn range_query(&self, query: &RangeQuery) -> Result<Vec<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.start_at == self.fail_on {
                return Err(NearbyError::Storage("unavailable".into()));
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_one_failure_fails_everything() {
        let store = FailingStore {
            calls: AtomicUsize::new(0),
            fail_on: "d6q",
        };
        let bounds = vec![Bound::new("d6n", "d6p"), Bound::new("d6q", "d6r")];

        let err = fetch_bounds(&store, &base(), &bounds).await.unwrap_err();
        match err {
            NearbyError::Storage(message) => {
                assert!(message.contains("[d6q, d6r]"));
                assert!(message.contains("unavailable"));
            }
            other => panic!("expected storage error, got {:?}", other),
        }
    }

    /// Every query takes one second and records how many are in flight.
    #[derive(Default)]
    struct SleepyStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl RangeStore for SleepyStore {
        async fn range_query(&self, _query: &RangeQuery) -> Result<Vec<Document>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounds_fetched_concurrently() {
        let store = SleepyStore::default();
        let bounds = vec![
            Bound::new("d6n", "d6p"),
            Bound::new("d6q", "d6r"),
            Bound::new("d6s", "d6t"),
        ];

        let started = tokio::time::Instant::now();
        let fetched = fetch_bounds(&store, &base(), &bounds).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(fetched.len(), 3);
        assert_eq!(store.peak.load(Ordering::SeqCst), 3);
        // one round trip, not one per bound
        assert!(elapsed < std::time::Duration::from_secs(2), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_no_bounds_no_queries() {
        let store = seeded_store();
        let fetched = fetch_bounds(&store, &base(), &[]).await.unwrap();
        assert!(fetched.is_empty());
        assert_eq!(store.stats().range_queries, 0);
    }
}
