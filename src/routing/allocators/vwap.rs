use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::warn;

use super::best_price::BestPriceAllocator;
use crate::routing::traits::{Allocation, AllocationContext, Allocator, Candidate};
use crate::routing::types::{RoutingRequest, RoutingStrategy, RoutingWarning};

/// Volume-weighted split across venues
///
/// Each venue with positive 24h volume and a quote on the relevant side
/// gets floor(Q x volume / total volume), capped at what is still
/// unallocated, priced at its best quote. Flooring remainders stay
/// unrouted. With no volume to weight by the request falls back to
/// [`BestPriceAllocator`].
#[derive(Debug, Default, Clone, Copy)]
pub struct VwapAllocator;

impl Allocator for VwapAllocator {
    fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::Vwap
    }

    fn allocate(
        &self,
        candidates: &[Candidate],
        request: &RoutingRequest,
        ctx: &AllocationContext,
    ) -> Allocation {
        let side = request.side;
        let weighted: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.depth.volume_24h > Decimal::ZERO)
            .filter(|c| c.depth.best_price(side).is_some())
            .collect();
        let total_volume: Decimal = weighted.iter().map(|c| c.depth.volume_24h).sum();

        if total_volume <= Decimal::ZERO {
            warn!("VWAP for {} has no volume to weight by", request.symbol);
            let mut fallback = BestPriceAllocator.allocate(candidates, request, ctx);
            fallback.warnings.push(RoutingWarning::ZeroVolumeFallback {
                used: fallback.strategy_used,
            });
            return fallback;
        }

        let mut allocation = Allocation::new(RoutingStrategy::Vwap);
        let quantity = Decimal::from(request.quantity);
        let mut remaining = request.quantity;

        for candidate in weighted {
            if remaining == 0 {
                break;
            }
            let Some(price) = candidate.depth.best_price(side) else {
                continue;
            };

            // floor(Q x volume / total), with no intermediate rounded weight
            let share = (quantity * candidate.depth.volume_24h / total_volume)
                .floor()
                .to_u64()
                .unwrap_or(0);
            let allocated = share.min(remaining);

            allocation.push(candidate.route(request, price, allocated, ctx.now));
            remaining -= allocated;
        }

        allocation
    }
}
