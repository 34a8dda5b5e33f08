//! Liquidity scoring
//!
//! Composite venue/symbol score built from four sub-scores in [0, 1]:
//! displayed depth, relative spread, 24h volume and feed reliability.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument};

use super::depth_cache::{DepthCache, DepthKey};
use crate::common::errors::Result;
use crate::common::types::MarketDepth;

/// Liquidity score for one venue/symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityScore {
    pub venue_id: String,
    pub symbol: String,
    pub depth_score: Decimal,
    pub spread_score: Decimal,
    pub volume_score: Decimal,
    pub reliability_score: Decimal,
    /// Unweighted mean of the four sub-scores
    pub composite: Decimal,
    pub computed_at: DateTime<Utc>,
}

/// Normalization constants for the depth and volume sub-scores
#[derive(Debug, Clone)]
pub struct ScoringParams {
    pub depth_normalization: Decimal,
    pub volume_normalization: Decimal,
}

/// Clamp a value into [0, 1]
pub(crate) fn clamp_unit(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE)
}

/// Reliability sub-score: 1 - latency/1000, clamped
pub fn reliability_score(latency_ms: u64) -> Decimal {
    clamp_unit(Decimal::ONE - Decimal::from(latency_ms) / Decimal::from(1000))
}

fn ratio_capped(value: Decimal, normalization: Decimal) -> Decimal {
    if normalization <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    clamp_unit(value / normalization)
}

/// Score a depth snapshot with the given normalization constants
pub fn score_depth(depth: &MarketDepth, params: &ScoringParams) -> LiquidityScore {
    let depth_score = ratio_capped(
        Decimal::from(depth.total_displayed_quantity()),
        params.depth_normalization,
    );

    let spread_score = match depth.best_bid() {
        Some(bid) if bid.price > Decimal::ZERO => {
            clamp_unit(Decimal::ONE - depth.spread / bid.price * Decimal::from(100))
        }
        _ => Decimal::ZERO,
    };

    let volume_score = ratio_capped(depth.volume_24h, params.volume_normalization);
    let reliability = reliability_score(depth.latency_ms);

    let composite = (depth_score + spread_score + volume_score + reliability) / Decimal::from(4);

    LiquidityScore {
        venue_id: depth.venue_id.clone(),
        symbol: depth.symbol.clone(),
        depth_score,
        spread_score,
        volume_score,
        reliability_score: reliability,
        composite,
        computed_at: Utc::now(),
    }
}

/// Cached liquidity scorer backed by the depth cache
pub struct LiquidityScorer {
    depths: Arc<DepthCache>,
    params: ScoringParams,
    ttl: Duration,
    cache: RwLock<HashMap<DepthKey, (LiquidityScore, Instant)>>,
}

impl LiquidityScorer {
    pub fn new(depths: Arc<DepthCache>, params: ScoringParams, ttl: Duration) -> Self {
        Self {
            depths,
            params,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Score a venue/symbol, serving a cached score while it is younger than the TTL
    #[instrument(skip(self))]
    pub async fn score(&self, venue_id: &str, symbol: &str, deadline: Instant) -> Result<LiquidityScore> {
        let key = (venue_id.to_string(), symbol.to_string());
        {
            let cache = self.cache.read().await;
            if let Some((score, at)) = cache.get(&key) {
                if at.elapsed() < self.ttl {
                    return Ok(score.clone());
                }
            }
        }

        let depth = self.depths.get(venue_id, symbol, deadline).await?;
        Ok(self.store(key, &depth).await)
    }

    /// Recompute from a freshly refreshed snapshot, bypassing both caches
    #[instrument(skip(self))]
    pub async fn score_fresh(
        &self,
        venue_id: &str,
        symbol: &str,
        deadline: Instant,
    ) -> Result<LiquidityScore> {
        let key = (venue_id.to_string(), symbol.to_string());
        let depth = self.depths.refresh(venue_id, symbol, deadline).await?;
        Ok(self.store(key, &depth).await)
    }

    /// Score a snapshot already in hand, without touching the cache
    pub fn score_depth(&self, depth: &MarketDepth) -> LiquidityScore {
        score_depth(depth, &self.params)
    }

    async fn store(&self, key: DepthKey, depth: &MarketDepth) -> LiquidityScore {
        let score = score_depth(depth, &self.params);
        debug!(
            "Liquidity {}/{} composite={}",
            key.0, key.1, score.composite
        );
        self.cache
            .write()
            .await
            .insert(key, (score.clone(), Instant::now()));
        score
    }
}
