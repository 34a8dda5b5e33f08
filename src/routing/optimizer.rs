use tracing::debug;

use super::types::{OrderRoute, SorPlan};

/// Post-processes plans by collapsing routes to the same venue
///
/// Merging keeps the first route's price, fill probability and creation
/// time, sums quantity and fee, and renumbers priorities 1..N in first
/// occurrence order. Plan aggregates are recomputed afterwards. Applying
/// the optimizer twice yields the same plan as applying it once.
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteOptimizer;

impl RouteOptimizer {
    pub fn new() -> Self {
        Self
    }

    pub fn optimize(&self, mut plan: SorPlan) -> SorPlan {
        let before = plan.routes.len();
        let mut merged: Vec<OrderRoute> = Vec::with_capacity(before);

        for route in plan.routes.drain(..) {
            match merged.iter_mut().find(|r| r.venue_id == route.venue_id) {
                Some(existing) => {
                    existing.quantity += route.quantity;
                    existing.fee += route.fee;
                }
                None => merged.push(route),
            }
        }

        for (i, route) in merged.iter_mut().enumerate() {
            route.priority = i as u32 + 1;
        }

        if merged.len() != before {
            debug!(
                "Merged {} routes into {} for plan {}",
                before,
                merged.len(),
                plan.id
            );
        }

        plan.routes = merged;
        plan.refresh_aggregates();
        plan
    }
}
