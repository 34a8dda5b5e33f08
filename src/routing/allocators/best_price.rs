use crate::common::types::{PriceLevel, Side};
use crate::routing::traits::{Allocation, AllocationContext, Allocator, Candidate};
use crate::routing::types::{RoutingRequest, RoutingStrategy};

/// Greedy price-priority sweep across every venue's book
///
/// All levels on the relevant side are flattened and walked from best to
/// worst price. Equal prices keep aggregation order (stable sort). One route
/// is emitted per consumed (venue, level). Quantity the books cannot absorb
/// is left unrouted.
#[derive(Debug, Default, Clone, Copy)]
pub struct BestPriceAllocator;

impl Allocator for BestPriceAllocator {
    fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::BestPrice
    }

    fn allocate(
        &self,
        candidates: &[Candidate],
        request: &RoutingRequest,
        ctx: &AllocationContext,
    ) -> Allocation {
        let side = request.side;
        let mut levels: Vec<(&Candidate, &PriceLevel)> = candidates
            .iter()
            .flat_map(|c| c.depth.levels(side).iter().map(move |level| (c, level)))
            .collect();

        match side {
            Side::Buy => levels.sort_by(|a, b| a.1.price.cmp(&b.1.price)),
            Side::Sell => levels.sort_by(|a, b| b.1.price.cmp(&a.1.price)),
        }

        let mut allocation = Allocation::new(RoutingStrategy::BestPrice);
        let mut remaining = request.quantity;

        for (candidate, level) in levels {
            if remaining == 0 {
                break;
            }
            let quantity = level.quantity.min(remaining);
            if quantity == 0 {
                continue;
            }
            allocation.push(candidate.route(request, level.price, quantity, ctx.now));
            remaining -= quantity;
        }

        allocation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::allocators::test_support::{candidate, context, levels};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_two_venue_buy_sweep() {
        let candidates = vec![
            candidate("A", levels(&[(dec!(100.0), 500)]), vec![], dec!(0)),
            candidate("B", levels(&[(dec!(100.5), 300)]), vec![], dec!(0)),
        ];
        let request = RoutingRequest::new("AAPL", Side::Buy, 700);

        let allocation = BestPriceAllocator.allocate(&candidates, &request, &context());

        assert_eq!(allocation.routes.len(), 2);
        assert_eq!(allocation.routes[0].venue_id, "A");
        assert_eq!(allocation.routes[0].price, dec!(100.0));
        assert_eq!(allocation.routes[0].quantity, 500);
        assert_eq!(allocation.routes[1].venue_id, "B");
        assert_eq!(allocation.routes[1].price, dec!(100.5));
        assert_eq!(allocation.routes[1].quantity, 200);
        assert_eq!(allocation.allocated(), 700);
    }

    #[test]
    fn test_interleaved_levels_follow_price() {
        let candidates = vec![
            candidate("A", levels(&[(dec!(10.0), 100), (dec!(10.3), 100)]), vec![], dec!(0)),
            candidate("B", levels(&[(dec!(10.1), 100), (dec!(10.2), 100)]), vec![], dec!(0)),
        ];
        let request = RoutingRequest::new("AAPL", Side::Buy, 350);

        let allocation = BestPriceAllocator.allocate(&candidates, &request, &context());
        let prices: Vec<Decimal> = allocation.routes.iter().map(|r| r.price).collect();

        assert_eq!(prices, vec![dec!(10.0), dec!(10.1), dec!(10.2), dec!(10.3)]);
        assert_eq!(allocation.routes[3].quantity, 50);
    }

    #[test]
    fn test_sell_sweeps_bids_descending() {
        let candidates = vec![
            candidate("A", vec![], levels(&[(dec!(99.0), 100)]), dec!(0)),
            candidate("B", vec![], levels(&[(dec!(99.5), 100), (dec!(98.0), 100)]), dec!(0)),
        ];
        let request = RoutingRequest::new("AAPL", Side::Sell, 150);

        let allocation = BestPriceAllocator.allocate(&candidates, &request, &context());

        assert_eq!(allocation.routes[0].venue_id, "B");
        assert_eq!(allocation.routes[0].price, dec!(99.5));
        assert_eq!(allocation.routes[1].venue_id, "A");
        assert_eq!(allocation.routes[1].quantity, 50);
    }

    #[test]
    fn test_equal_prices_keep_aggregation_order() {
        let candidates = vec![
            candidate("A", levels(&[(dec!(50), 100)]), vec![], dec!(0)),
            candidate("B", levels(&[(dec!(50), 100)]), vec![], dec!(0)),
        ];
        let request = RoutingRequest::new("AAPL", Side::Buy, 150);

        let allocation = BestPriceAllocator.allocate(&candidates, &request, &context());

        assert_eq!(allocation.routes[0].venue_id, "A");
        assert_eq!(allocation.routes[0].quantity, 100);
        assert_eq!(allocation.routes[1].venue_id, "B");
        assert_eq!(allocation.routes[1].quantity, 50);
    }

    #[test]
    fn test_shortfall_is_left_unrouted() {
        let candidates = vec![candidate("A", levels(&[(dec!(20), 40)]), vec![], dec!(0))];
        let request = RoutingRequest::new("AAPL", Side::Buy, 100);

        let allocation = BestPriceAllocator.allocate(&candidates, &request, &context());

        assert_eq!(allocation.routes.len(), 1);
        assert_eq!(allocation.allocated(), 40);
    }

    #[test]
    fn test_no_route_left_with_cheaper_unused_capacity() {
        let candidates = vec![
            candidate("A", levels(&[(dec!(5.0), 0), (dec!(5.2), 30)]), vec![], dec!(0)),
            candidate("B", levels(&[(dec!(5.1), 70), (dec!(5.4), 70)]), vec![], dec!(0)),
            candidate("C", levels(&[(dec!(5.3), 10)]), vec![], dec!(0)),
        ];
        let request = RoutingRequest::new("AAPL", Side::Buy, 120);

        let allocation = BestPriceAllocator.allocate(&candidates, &request, &context());

        // every consumed level except the last is taken in full, and prices never decrease
        let routes = &allocation.routes;
        for pair in routes.windows(2) {
            assert!(pair[0].price <= pair[1].price);
        }
        assert!(routes.iter().all(|r| r.quantity > 0));
        assert_eq!(allocation.allocated(), 120);
        assert_eq!(routes.last().unwrap().price, dec!(5.4));
        assert_eq!(routes.last().unwrap().quantity, 10);
    }
}
