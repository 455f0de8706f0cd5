//! Proximity search orchestration.
//!
//! A search validates its input, then runs one or two passes. Each pass
//! computes key bounds for its radius, fetches every bound concurrently,
//! decodes and refines the rows, and keeps the closest candidate per entity.
//! The passes are merged by minimum distance, and the merged set goes through
//! the authoritative radius and attribute checks before ranking.
//!
//! ```text
//! validate -> wide pass -> [narrow pass] -> merge -> final filter -> rank
//! ```

use crate::config::{PassStrategy, SearchConfig};
use crate::distance::refine_within;
use crate::entity::{Business, NearbyBusiness};
use crate::error::{NearbyError, Result};
use crate::executor::fetch_bounds;
use crate::filter::AttributeFilter;
use crate::geokey::GeoKeyCodec;
use crate::merge::{Candidate, MergeSet};
use crate::rank::{into_output, rank};
use crate::store::{RangeQuery, RangeStore};
use crate::validation::{validate_center, validate_radius_km};
use geo::Point;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Caller input for one search.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    /// Search center (x = longitude, y = latitude)
    pub center: Point,
    pub radius_km: f64,
    pub filter: AttributeFilter,
}

impl NearbyQuery {
    pub fn new(lat: f64, lng: f64, radius_km: f64) -> Self {
        Self {
            center: Point::new(lng, lat),
            radius_km,
            filter: AttributeFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: AttributeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_km * 1000.0
    }
}

/// Statistics about one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassStats {
    /// Radius the bounds and the cutoff were computed for
    pub radius_meters: f64,

    /// Number of key bounds queried
    pub bounds: usize,

    /// Rows returned by the store, duplicates across bounds included
    pub rows_fetched: usize,

    /// Rows left out because they could not be located
    pub rows_skipped: usize,

    /// Distinct entities within the pass radius
    pub candidates_kept: usize,
}

/// Statistics about a search execution.
#[derive(Debug, Clone)]
pub struct SearchStats {
    pub strategy: PassStrategy,

    /// Wall time from the first pass to the ranked output
    pub elapsed: Duration,

    pub passes: Vec<PassStats>,

    /// Number of rows considered across every pass (before filtering)
    pub candidates_examined: usize,

    /// Number of results returned (after filtering)
    pub results_returned: usize,
}

/// Ranked results plus how they were produced.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub businesses: Vec<NearbyBusiness>,
    pub stats: SearchStats,
}

/// Proximity search over a [`RangeStore`].
///
/// The store handle is shared; every search builds its own merge state, so one
/// `ProximitySearch` can serve any number of concurrent searches.
///
/// ```rust
/// use nearby::{MemoryStore, NearbyQuery, ProximitySearch, SearchConfig};
/// use std::sync::Arc;
///
/// # tokio_test_block_on(async {
/// let search = ProximitySearch::new(Arc::new(MemoryStore::new()), SearchConfig::default()).unwrap();
/// let response = search.search(&NearbyQuery::new(10.0, -66.0, 5.0)).await.unwrap();
/// assert!(response.businesses.is_empty());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
/// # }
/// ```
pub struct ProximitySearch<S> {
    store: Arc<S>,
    config: SearchConfig,
    codec: GeoKeyCodec,
}

impl<S> Clone for ProximitySearch<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            codec: self.codec,
        }
    }
}

impl<S: RangeStore> ProximitySearch<S> {
    /// Create a search over `store`, rejecting an invalid configuration.
    pub fn new(store: Arc<S>, config: SearchConfig) -> Result<Self> {
        config.validate().map_err(NearbyError::InvalidConfig)?;
        let codec = GeoKeyCodec::new(config.geohash_precision)?;
        Ok(Self {
            store,
            config,
            codec,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn codec(&self) -> &GeoKeyCodec {
        &self.codec
    }

    /// Run a search.
    ///
    /// Invalid input fails before the store is touched. A storage failure in
    /// any bound, or running past the configured deadline, fails the whole
    /// search; partial results are never returned.
    pub async fn search(&self, query: &NearbyQuery) -> Result<SearchResponse> {
        validate_center(&query.center)?;
        validate_radius_km(query.radius_km, self.config.max_radius_km)?;

        let deadline = self.config.query_timeout();
        match tokio::time::timeout(deadline, self.execute(query)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "search around ({}, {}) r={} km exceeded {:?}",
                    query.center.y(),
                    query.center.x(),
                    query.radius_km,
                    deadline
                );
                Err(NearbyError::Timeout(deadline))
            }
        }
    }

    async fn execute(&self, query: &NearbyQuery) -> Result<SearchResponse> {
        let started = Instant::now();
        let strategy = self.config.strategy_for(query.radius_km);
        let radius_meters = query.radius_meters();

        let base = RangeQuery::new(self.config.collection.as_str())
            .with_filters(query.filter.pushdown(self.config.require_active))
            .order_by(self.config.geohash_field.as_str());

        let mut merged = MergeSet::new();
        let mut passes = Vec::with_capacity(2);
        for pass_radius in self.pass_radii(strategy, radius_meters) {
            let (found, stats) = self.run_pass(&base, &query.center, pass_radius).await?;
            merged.merge(found);
            passes.push(stats);
        }

        let survivors: Vec<Candidate> = merged
            .into_candidates()
            .into_iter()
            .filter(|candidate| {
                candidate.distance_meters <= radius_meters
                    && query
                        .filter
                        .admits(&candidate.business, self.config.require_active)
            })
            .collect();
        let businesses = into_output(rank(survivors));

        let stats = SearchStats {
            strategy,
            elapsed: started.elapsed(),
            candidates_examined: passes.iter().map(|p| p.rows_fetched).sum(),
            results_returned: businesses.len(),
            passes,
        };
        log::debug!(
            "search around ({}, {}) r={} km: {:?}, {} examined, {} returned in {:?}",
            query.center.y(),
            query.center.x(),
            query.radius_km,
            stats.strategy,
            stats.candidates_examined,
            stats.results_returned,
            stats.elapsed
        );

        Ok(SearchResponse { businesses, stats })
    }

    fn pass_radii(&self, strategy: PassStrategy, radius_meters: f64) -> Vec<f64> {
        match strategy {
            PassStrategy::SinglePass => vec![radius_meters],
            PassStrategy::WideNarrow => {
                let margin = self.config.coverage_margin;
                vec![radius_meters * (1.0 + margin), radius_meters * (1.0 - margin)]
            }
        }
    }

    /// One collect-and-refine pass. Distances are computed fresh against this
    /// pass's radius.
    async fn run_pass(
        &self,
        base: &RangeQuery,
        center: &Point,
        radius_meters: f64,
    ) -> Result<(MergeSet, PassStats)> {
        let bounds = self.codec.bounds_for(center, radius_meters);
        let fetched = fetch_bounds(self.store.as_ref(), base, &bounds).await?;

        let mut found = MergeSet::new();
        let mut rows_fetched = 0;
        let mut rows_skipped = 0;

        for partition in &fetched {
            rows_fetched += partition.rows.len();
            for doc in &partition.rows {
                let business = match Business::from_document(doc, &self.config.geohash_field) {
                    Ok(business) => business,
                    Err(reason) => {
                        rows_skipped += 1;
                        log::debug!("skipping document {}: {}", doc.id, reason);
                        continue;
                    }
                };
                if let Some(distance) = refine_within(center, &business, radius_meters) {
                    found.offer(Candidate::new(business, distance));
                }
            }
        }

        let stats = PassStats {
            radius_meters,
            bounds: bounds.len(),
            rows_fetched,
            rows_skipped,
            candidates_kept: found.len(),
        };
        log::debug!(
            "pass r={:.0} m: {} bound(s), {} row(s), {} skipped, {} kept",
            stats.radius_meters,
            stats.bounds,
            stats.rows_fetched,
            stats.rows_skipped,
            stats.candidates_kept
        );
        Ok((found, stats))
    }
}
