use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::market::impact_ratio;
use crate::routing::traits::{Allocation, AllocationContext, Allocator, Candidate};
use crate::routing::types::{RoutingRequest, RoutingStrategy};

/// Single pass over venues from least to most impacted
///
/// Venues are ranked by the impact ratio of the full quantity (stable, so
/// ties keep aggregation order). Each venue takes at most
/// `ctx.min_impact_participation` of its available liquidity. Anything left
/// after one pass stays unrouted.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinImpactAllocator;

impl Allocator for MinImpactAllocator {
    fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::MinImpact
    }

    fn allocate(
        &self,
        candidates: &[Candidate],
        request: &RoutingRequest,
        ctx: &AllocationContext,
    ) -> Allocation {
        let side = request.side;
        let mut ranked: Vec<(Decimal, &Candidate)> = candidates
            .iter()
            .map(|c| (impact_ratio(&c.depth, request.quantity, side), c))
            .collect();
        ranked.sort_by(|a, b| a.0.cmp(&b.0));

        let mut allocation = Allocation::new(RoutingStrategy::MinImpact);
        let mut remaining = request.quantity;

        for (_, candidate) in ranked {
            if remaining == 0 {
                break;
            }
            let Some(price) = candidate.depth.best_price(side) else {
                continue;
            };

            let available = Decimal::from(candidate.depth.available_liquidity(side));
            let cap = (available * ctx.min_impact_participation)
                .floor()
                .to_u64()
                .unwrap_or(0);
            let quantity = cap.min(remaining);

            allocation.push(candidate.route(request, price, quantity, ctx.now));
            remaining -= quantity;
        }

        allocation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Side;
    use crate::routing::allocators::test_support::{candidate, context, levels};
    use rust_decimal_macros::dec;

    #[test]
    fn test_least_impacted_venue_first_and_capped() {
        let candidates = vec![
            candidate("SHALLOW", levels(&[(dec!(10.0), 1000)]), vec![], dec!(0)),
            candidate("DEEP", levels(&[(dec!(10.2), 5000), (dec!(10.3), 5000)]), vec![], dec!(0)),
        ];
        let request = RoutingRequest::new("AAPL", Side::Buy, 500);

        let allocation = MinImpactAllocator.allocate(&candidates, &request, &context());

        assert_eq!(allocation.routes[0].venue_id, "DEEP");
        assert_eq!(allocation.routes[0].quantity, 500);
        assert_eq!(allocation.routes[0].price, dec!(10.2));
        assert_eq!(allocation.routes.len(), 1);
    }

    #[test]
    fn test_single_pass_leaves_remainder() {
        let candidates = vec![
            candidate("A", levels(&[(dec!(10.0), 1000)]), vec![], dec!(0)),
            candidate("B", levels(&[(dec!(10.1), 2000)]), vec![], dec!(0)),
        ];
        let request = RoutingRequest::new("AAPL", Side::Buy, 1000);

        let allocation = MinImpactAllocator.allocate(&candidates, &request, &context());
        let qty: Vec<(&str, u64)> = allocation
            .routes
            .iter()
            .map(|r| (r.venue_id.as_str(), r.quantity))
            .collect();

        assert_eq!(qty, vec![("B", 200), ("A", 100)]);
        assert_eq!(allocation.allocated(), 300);
    }

    #[test]
    fn test_empty_venue_skipped() {
        let candidates = vec![
            candidate("EMPTY", vec![], vec![], dec!(0)),
            candidate("A", levels(&[(dec!(10.0), 100)]), vec![], dec!(0)),
        ];
        let request = RoutingRequest::new("AAPL", Side::Buy, 50);

        let allocation = MinImpactAllocator.allocate(&candidates, &request, &context());

        assert_eq!(allocation.routes.len(), 1);
        assert_eq!(allocation.routes[0].venue_id, "A");
        assert_eq!(allocation.routes[0].quantity, 10);
    }
}
