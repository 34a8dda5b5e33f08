//! Market depth cache
//!
//! Holds the latest depth snapshot per (venue, symbol). Stale or missing
//! entries are refreshed synchronously through the [`MarketDataGateway`],
//! bounded by the caller's deadline.
//!
//! # Refresh coalescing
//!
//! Every key has its own async refresh lock, so at most one gateway call per
//! key is outstanding. A caller that waited on the lock and finds the entry
//! was written after it started waiting reuses that snapshot instead of
//! issuing a second call. A key's lock is dropped from the table once its
//! last refresh finishes, so the table only holds keys being refreshed.

use futures_util::future::join_all;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, instrument, warn};

use crate::common::errors::{Result, SorError};
use crate::common::traits::MarketDataGateway;
use crate::common::types::{MarketDepth, VenueId};

/// Cache key: (venue, symbol)
pub type DepthKey = (VenueId, String);

#[derive(Debug, Clone)]
struct CachedDepth {
    depth: MarketDepth,
    fetched_at: Instant,
}

/// A venue whose depth could not be obtained during aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueFailure {
    pub venue_id: VenueId,
    pub reason: String,
}

/// Result of aggregating depth across venues
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Depths in the order the venues were requested
    pub depths: Vec<MarketDepth>,
    /// Venues dropped from this aggregation
    pub failures: Vec<VenueFailure>,
}

/// Concurrency-safe depth cache in front of a market data gateway
pub struct DepthCache {
    gateway: Arc<dyn MarketDataGateway>,
    ttl: Duration,
    entries: RwLock<HashMap<DepthKey, CachedDepth>>,
    refresh_locks: SyncMutex<HashMap<DepthKey, Arc<Mutex<()>>>>,
}

impl DepthCache {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, ttl: Duration) -> Self {
        Self {
            gateway,
            ttl,
            entries: RwLock::new(HashMap::new()),
            refresh_locks: SyncMutex::new(HashMap::new()),
        }
    }

    /// Get depth, refreshing if the cached entry is missing or stale
    pub async fn get(&self, venue_id: &str, symbol: &str, deadline: Instant) -> Result<MarketDepth> {
        let key = (venue_id.to_string(), symbol.to_string());
        if let Some(depth) = self.fresh(&key).await {
            return Ok(depth);
        }
        self.refresh_key(key, deadline, false).await
    }

    /// Force a refresh from the gateway
    ///
    /// Concurrent forced refreshes of the same key share one gateway call.
    pub async fn refresh(
        &self,
        venue_id: &str,
        symbol: &str,
        deadline: Instant,
    ) -> Result<MarketDepth> {
        let key = (venue_id.to_string(), symbol.to_string());
        self.refresh_key(key, deadline, true).await
    }

    /// Fetch depth for `symbol` at every venue in `venue_ids`
    ///
    /// Venues are refreshed concurrently. A venue that fails or misses the
    /// deadline is dropped and reported in [`Aggregation::failures`]. Fails
    /// with [`SorError::InsufficientData`] only when every venue failed.
    #[instrument(skip(self, venue_ids), fields(venues = venue_ids.len()))]
    pub async fn aggregate(
        &self,
        symbol: &str,
        venue_ids: &[VenueId],
        deadline: Instant,
    ) -> Result<Aggregation> {
        let fetches = venue_ids.iter().map(|venue_id| async move {
            let result = self.get(venue_id, symbol, deadline).await;
            (venue_id.clone(), result)
        });

        let mut aggregation = Aggregation::default();
        for (venue_id, result) in join_all(fetches).await {
            match result {
                Ok(depth) => aggregation.depths.push(depth),
                Err(e) => {
                    warn!("Dropping {} from {} aggregation: {}", venue_id, symbol, e);
                    aggregation.failures.push(VenueFailure {
                        venue_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !venue_ids.is_empty() && aggregation.depths.is_empty() {
            return Err(SorError::InsufficientData {
                symbol: symbol.to_string(),
                attempted: venue_ids.len(),
            });
        }

        debug!(
            "Aggregated {} depths for {} ({} failed)",
            aggregation.depths.len(),
            symbol,
            aggregation.failures.len()
        );
        Ok(aggregation)
    }

    /// Store a snapshot pushed by a market data feed
    pub async fn insert(&self, depth: MarketDepth) {
        let key = (depth.venue_id.clone(), depth.symbol.clone());
        self.entries.write().await.insert(
            key.clone(),
            CachedDepth {
                depth,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop a cached snapshot so the next read refreshes it
    pub async fn invalidate(&self, venue_id: &str, symbol: &str) {
        let key = (venue_id.to_string(), symbol.to_string());
        self.entries.write().await.remove(&key);
    }

    /// Cached snapshot regardless of age
    pub async fn peek(&self, venue_id: &str, symbol: &str) -> Option<MarketDepth> {
        let key = (venue_id.to_string(), symbol.to_string());
        self.entries.read().await.get(&key).map(|e| e.depth.clone())
    }

    async fn fresh(&self, key: &DepthKey) -> Option<MarketDepth> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.depth.clone())
    }

    fn refresh_lock(&self, key: &DepthKey) -> Arc<Mutex<()>> {
        self.refresh_locks
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Remove the key's lock unless another refresh still holds it
    fn prune_refresh_lock(&self, key: &DepthKey) {
        let mut locks = self.refresh_locks.lock();
        if locks.get(key).map_or(false, |lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    async fn refresh_key(&self, key: DepthKey, deadline: Instant, force: bool) -> Result<MarketDepth> {
        let lock = self.refresh_lock(&key);
        let result = self.refresh_locked(&lock, &key, deadline, force).await;
        drop(lock);
        // a cancelled refresh skips this; the key's next refresh prunes it
        self.prune_refresh_lock(&key);
        result
    }

    async fn refresh_locked(
        &self,
        lock: &Mutex<()>,
        key: &DepthKey,
        deadline: Instant,
        force: bool,
    ) -> Result<MarketDepth> {
        let requested_at = Instant::now();
        let _guard = timeout_at(deadline, lock.lock()).await.map_err(|_| {
            SorError::Timeout(format!("waiting for refresh of {}/{}", key.0, key.1))
        })?;

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                let refreshed_while_waiting = entry.fetched_at >= requested_at;
                let still_fresh = entry.fetched_at.elapsed() < self.ttl;
                if refreshed_while_waiting || (!force && still_fresh) {
                    debug!("Reusing refresh of {}/{}", key.0, key.1);
                    return Ok(entry.depth.clone());
                }
            }
        }

        debug!(
            "Refreshing {}/{} from {}",
            key.0,
            key.1,
            self.gateway.gateway_name()
        );
        let depth = timeout_at(deadline, self.gateway.latest_depth(&key.0, &key.1, deadline))
            .await
            .map_err(|_| SorError::Timeout(format!("depth refresh for {}/{}", key.0, key.1)))??;

        self.entries.write().await.insert(
            key.clone(),
            CachedDepth {
                depth: depth.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(depth)
    }
}
