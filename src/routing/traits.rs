use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::common::types::{MarketDepth, Venue};
use crate::market::reliability_score;
use crate::routing::types::{OrderRoute, RoutingRequest, RoutingStrategy, RoutingWarning};

/// An eligible venue with the depth obtained for this request
#[derive(Debug, Clone)]
pub struct Candidate {
    pub venue: Venue,
    pub depth: MarketDepth,
}

impl Candidate {
    pub fn new(venue: Venue, depth: MarketDepth) -> Self {
        Self { venue, depth }
    }

    /// Build a child route at this venue
    ///
    /// Fee is price x quantity x fee rate. Fill probability is the share of
    /// the route the venue's visible liquidity covers, discounted by the
    /// venue's latency reliability. Priority is assigned by the planner.
    pub fn route(
        &self,
        request: &RoutingRequest,
        price: Decimal,
        quantity: u64,
        created_at: DateTime<Utc>,
    ) -> OrderRoute {
        let available = Decimal::from(self.depth.available_liquidity(request.side));
        let coverage = if quantity == 0 {
            Decimal::ZERO
        } else {
            (available / Decimal::from(quantity)).min(Decimal::ONE)
        };

        OrderRoute {
            venue_id: self.venue.id.clone(),
            venue_name: self.venue.name.clone(),
            price,
            quantity,
            fill_probability: coverage * reliability_score(self.venue.latency_ms),
            fee: self.venue.fee_for(price, quantity),
            priority: 0,
            created_at,
        }
    }
}

/// Per-request parameters shared by every allocator
#[derive(Debug, Clone)]
pub struct AllocationContext {
    /// Generation time of the plan
    pub now: DateTime<Utc>,
    pub twap_intervals: u32,
    pub twap_slice_interval: chrono::Duration,
    pub min_impact_participation: Decimal,
}

/// Output of an allocator
#[derive(Debug, Clone)]
pub struct Allocation {
    /// Routes in emission order, all with positive quantity
    pub routes: Vec<OrderRoute>,
    pub warnings: Vec<RoutingWarning>,
    /// Strategy that actually produced the routes
    pub strategy_used: RoutingStrategy,
}

impl Allocation {
    pub fn new(strategy_used: RoutingStrategy) -> Self {
        Self {
            routes: Vec::new(),
            warnings: Vec::new(),
            strategy_used,
        }
    }

    /// Append a route, dropping it if empty
    pub fn push(&mut self, route: OrderRoute) {
        if route.quantity > 0 {
            self.routes.push(route);
        }
    }

    pub fn allocated(&self) -> u64 {
        self.routes.iter().map(|r| r.quantity).sum()
    }
}

/// Core allocation trait
///
/// An allocator splits a request's quantity across candidate venues.
/// Candidates arrive in aggregation order, which is also the tie-break order.
///
/// # Implementation Notes
///
/// - `allocate` is synchronous; all depth is already in hand
/// - Never emit more than `request.quantity` in total
/// - Never emit a zero-quantity route
pub trait Allocator: Send + Sync {
    /// Strategy this allocator implements
    fn strategy(&self) -> RoutingStrategy;

    fn allocate(
        &self,
        candidates: &[Candidate],
        request: &RoutingRequest,
        ctx: &AllocationContext,
    ) -> Allocation;
}

/// Boxed allocator for dynamic dispatch
pub type BoxedAllocator = Box<dyn Allocator>;
