use crate::routing::traits::{Allocation, AllocationContext, Allocator, Candidate};
use crate::routing::types::{RoutingRequest, RoutingStrategy};

/// Equal time slices released sequentially to one venue
///
/// Q is cut into `ctx.twap_intervals` slices of floor(Q / n); the last slice
/// absorbs the remainder so the slices sum to exactly Q. Every slice goes to
/// the first candidate quoting the relevant side, with `created_at`
/// staggered by one slice interval per index.
#[derive(Debug, Default, Clone, Copy)]
pub struct TwapAllocator;

/// Slice sizes for `quantity` over `intervals`, summing to `quantity`
pub fn twap_slices(quantity: u64, intervals: u32) -> Vec<u64> {
    let n = u64::from(intervals.max(1));
    let base = quantity / n;
    let mut slices = vec![base; n as usize];
    if let Some(last) = slices.last_mut() {
        *last = quantity - base * (n - 1);
    }
    slices
}

impl Allocator for TwapAllocator {
    fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::Twap
    }

    fn allocate(
        &self,
        candidates: &[Candidate],
        request: &RoutingRequest,
        ctx: &AllocationContext,
    ) -> Allocation {
        let mut allocation = Allocation::new(RoutingStrategy::Twap);

        let quoted = candidates.iter().find_map(|c| {
            c.depth
                .best_price(request.side)
                .map(|price| (c, price))
        });
        let Some((venue, price)) = quoted else {
            return allocation;
        };

        for (index, slice) in twap_slices(request.quantity, ctx.twap_intervals)
            .into_iter()
            .enumerate()
        {
            let release_at = ctx.now + ctx.twap_slice_interval * index as i32;
            allocation.push(venue.route(request, price, slice, release_at));
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
    fn test_slices_sum_exactly() {
        for quantity in [10u64, 11, 99, 1000, 1009, 123_457] {
            let slices = twap_slices(quantity, 10);
            assert_eq!(slices.len(), 10);
            assert_eq!(slices.iter().sum::<u64>(), quantity);
            assert!(slices[..9].iter().all(|&s| s == quantity / 10));
        }
    }

    #[test]
    fn test_small_quantity_goes_to_last_slice() {
        assert_eq!(twap_slices(7, 10), vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 7]);
    }

    #[test]
    fn test_routes_staggered_on_first_quoted_venue() {
        let candidates = vec![
            candidate("A", vec![], levels(&[(dec!(9.9), 10)]), dec!(0)),
            candidate("B", levels(&[(dec!(10.0), 10)]), vec![], dec!(0)),
        ];
        let request = RoutingRequest::new("AAPL", Side::Buy, 105);
        let ctx = context();

        let allocation = TwapAllocator.allocate(&candidates, &request, &ctx);

        assert_eq!(allocation.routes.len(), 10);
        assert!(allocation.routes.iter().all(|r| r.venue_id == "B"));
        assert_eq!(allocation.routes[9].quantity, 15);
        assert_eq!(allocation.allocated(), 105);
        for (i, route) in allocation.routes.iter().enumerate() {
            assert_eq!(route.created_at, ctx.now + ctx.twap_slice_interval * i as i32);
        }
    }

    #[test]
    fn test_zero_slices_dropped() {
        let candidates = vec![candidate("A", levels(&[(dec!(10.0), 10)]), vec![], dec!(0))];
        let request = RoutingRequest::new("AAPL", Side::Buy, 3);

        let allocation = TwapAllocator.allocate(&candidates, &request, &context());

        assert_eq!(allocation.routes.len(), 1);
        assert_eq!(allocation.routes[0].quantity, 3);
    }

    #[test]
    fn test_no_quoted_venue_yields_no_routes() {
        let candidates = vec![candidate("A", vec![], vec![], dec!(0))];
        let request = RoutingRequest::new("AAPL", Side::Buy, 100);

        let allocation = TwapAllocator.allocate(&candidates, &request, &context());
        assert!(allocation.routes.is_empty());
    }
}
