//! Market impact estimation

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{instrument, warn};

use super::depth_cache::DepthCache;
use crate::common::errors::{Result, SorError};
use crate::common::types::{MarketDepth, Side, VenueId};
use crate::routing::RoutingWarning;

/// Fraction of the venue's available liquidity `quantity` would consume
///
/// Available liquidity is the ask side for a buy and the bid side for a
/// sell. With nothing available the ratio is 1.0 (maximal impact).
pub fn impact_ratio(depth: &MarketDepth, quantity: u64, side: Side) -> Decimal {
    let available = depth.available_liquidity(side);
    if available == 0 {
        return Decimal::ONE;
    }
    Decimal::from(quantity) / Decimal::from(available)
}

/// Arithmetic mean of [`impact_ratio`] over `depths`, zero when empty
pub fn mean_impact(depths: &[MarketDepth], quantity: u64, side: Side) -> Decimal {
    if depths.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = depths
        .iter()
        .map(|depth| impact_ratio(depth, quantity, side))
        .sum();
    total / Decimal::from(depths.len())
}

/// Impact estimate across the eligible venues for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    /// Mean impact ratio across the venues that returned depth
    pub ratio: Decimal,
    pub venues_considered: usize,
    pub warnings: Vec<RoutingWarning>,
}

/// Estimates impact using depths from the shared cache
pub struct MarketImpactEstimator {
    depths: Arc<DepthCache>,
}

impl MarketImpactEstimator {
    pub fn new(depths: Arc<DepthCache>) -> Self {
        Self { depths }
    }

    /// Mean impact ratio of `quantity` across `venue_ids`
    ///
    /// No eligible venues yields a ratio of zero plus a warning. Venues that
    /// fail to refresh are left out and reported as warnings.
    #[instrument(skip(self, venue_ids))]
    pub async fn estimate(
        &self,
        symbol: &str,
        side: Side,
        quantity: u64,
        venue_ids: &[VenueId],
        deadline: Instant,
    ) -> Result<ImpactEstimate> {
        if quantity == 0 {
            return Err(SorError::InvalidRequest(
                "impact quantity must be positive".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        if venue_ids.is_empty() {
            warn!("No eligible venues for {} impact estimate", symbol);
            warnings.push(RoutingWarning::NoEligibleVenues {
                symbol: symbol.to_string(),
            });
        }

        let aggregation = self.depths.aggregate(symbol, venue_ids, deadline).await?;
        warnings.extend(
            aggregation
                .failures
                .into_iter()
                .map(RoutingWarning::from),
        );

        Ok(ImpactEstimate {
            symbol: symbol.to_string(),
            side,
            quantity,
            ratio: mean_impact(&aggregation.depths, quantity, side),
            venues_considered: aggregation.depths.len(),
            warnings,
        })
    }
}
