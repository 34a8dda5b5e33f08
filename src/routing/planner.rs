//! Routing planner
//!
//! Dispatches a request to the allocator registered for its strategy and
//! turns the resulting routes into a [`SorPlan`] with aggregate metrics.
//! Strategies without a registered allocator are routed by
//! [`BestPriceAllocator`] and flagged with an `UnsupportedStrategy` warning.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::allocators::{BestPriceAllocator, MinImpactAllocator, TwapAllocator, VwapAllocator};
use super::traits::{Allocation, AllocationContext, BoxedAllocator, Candidate};
use super::types::{PlanStatus, RoutingRequest, RoutingStrategy, RoutingWarning, SorPlan};
use crate::common::types::Side;
use crate::config::RouterSettings;
use crate::market::mean_impact;

pub struct RoutingPlanner {
    allocators: HashMap<RoutingStrategy, BoxedAllocator>,
    fallback: BoxedAllocator,
    settings: RouterSettings,
}

impl RoutingPlanner {
    /// Planner with the built-in allocators registered
    pub fn new(settings: RouterSettings) -> Self {
        let mut planner = Self {
            allocators: HashMap::new(),
            fallback: Box::new(BestPriceAllocator),
            settings,
        };
        planner.register(Box::new(BestPriceAllocator));
        planner.register(Box::new(VwapAllocator));
        planner.register(Box::new(TwapAllocator));
        planner.register(Box::new(MinImpactAllocator));
        planner
    }

    /// Register (or replace) the allocator for its strategy
    pub fn register(&mut self, allocator: BoxedAllocator) {
        self.allocators.insert(allocator.strategy(), allocator);
    }

    /// Whether `strategy` has its own allocator
    pub fn supports(&self, strategy: RoutingStrategy) -> bool {
        self.allocators.contains_key(&strategy)
    }

    /// Build a plan for `request` from candidates in aggregation order
    ///
    /// Returns the plan and the warnings raised while producing it.
    pub fn plan(&self, request: &RoutingRequest, candidates: &[Candidate]) -> (SorPlan, Vec<RoutingWarning>) {
        let now = Utc::now();
        let ctx = AllocationContext {
            now,
            twap_intervals: self.settings.twap_intervals,
            twap_slice_interval: self.settings.twap_slice_interval(),
            min_impact_participation: self.settings.min_impact_participation,
        };

        let mut warnings = Vec::new();
        let Allocation {
            mut routes,
            warnings: allocation_warnings,
            strategy_used,
        } = match self.allocators.get(&request.strategy) {
            Some(allocator) => allocator.allocate(candidates, request, &ctx),
            None => {
                let used = self.fallback.strategy();
                warn!(
                    "Strategy {} not implemented, routing {} with {}",
                    request.strategy, request.parent_order_id, used
                );
                warnings.push(RoutingWarning::UnsupportedStrategy {
                    requested: request.strategy,
                    used,
                });
                self.fallback.allocate(candidates, request, &ctx)
            }
        };
        warnings.extend(allocation_warnings);

        for (i, route) in routes.iter_mut().enumerate() {
            route.priority = i as u32 + 1;
        }

        let depths: Vec<_> = candidates.iter().map(|c| c.depth.clone()).collect();
        let mut plan = SorPlan {
            id: Uuid::new_v4(),
            parent_order_id: request.parent_order_id.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            total_quantity: request.quantity,
            strategy: request.strategy,
            strategy_used,
            routes,
            average_price: Decimal::ZERO,
            total_fee: Decimal::ZERO,
            expected_cost: Decimal::ZERO,
            market_impact: mean_impact(&depths, request.quantity, request.side),
            confidence: Decimal::ZERO,
            generated_at: now,
            expires_at: now + self.settings.plan_ttl(),
            status: PlanStatus::Pending,
        };
        debug_assert!(plan.routed_quantity() <= request.quantity);

        plan.refresh_aggregates();
        plan.confidence = confidence(&plan);
        warnings.extend(check_plan(&mut plan, request, candidates));

        debug!(
            "Planned {} {} {}: {} routes, {} routed, avg {}",
            plan.side,
            plan.total_quantity,
            plan.symbol,
            plan.routes.len(),
            plan.routed_quantity(),
            plan.average_price
        );

        (plan, warnings)
    }
}

/// Routed share times the quantity-weighted mean fill probability
fn confidence(plan: &SorPlan) -> Decimal {
    let routed = plan.routed_quantity();
    if routed == 0 {
        return Decimal::ZERO;
    }
    let weighted: Decimal = plan
        .routes
        .iter()
        .map(|r| r.fill_probability * Decimal::from(r.quantity))
        .sum();
    plan.routed_ratio() * weighted / Decimal::from(routed)
}

fn best_quote(candidates: &[Candidate], side: Side) -> Option<Decimal> {
    let quotes = candidates.iter().filter_map(|c| c.depth.best_price(side));
    match side {
        Side::Buy => quotes.min(),
        Side::Sell => quotes.max(),
    }
}

/// Post-allocation checks; marks under-routed plans `Partial`
fn check_plan(
    plan: &mut SorPlan,
    request: &RoutingRequest,
    candidates: &[Candidate],
) -> Vec<RoutingWarning> {
    let mut warnings = Vec::new();

    let unrouted = plan.unrouted_quantity();
    if unrouted > 0 {
        plan.status = PlanStatus::Partial;
        warnings.push(RoutingWarning::InsufficientLiquidity {
            requested: plan.total_quantity,
            unrouted,
        });
    }

    let fill_rate = plan.routed_ratio();
    if fill_rate < request.min_fill_rate {
        warnings.push(RoutingWarning::BelowMinFillRate {
            fill_rate,
            minimum: request.min_fill_rate,
        });
    }

    if request.max_slippage > Decimal::ZERO && !plan.routes.is_empty() {
        if let Some(best) = best_quote(candidates, request.side).filter(|p| *p > Decimal::ZERO) {
            let slippage = (plan.average_price - best).abs() / best;
            if slippage > request.max_slippage {
                warnings.push(RoutingWarning::SlippageExceeded {
                    slippage,
                    maximum: request.max_slippage,
                });
            }
        }
    }

    let mut per_venue: Vec<(&str, u64)> = Vec::new();
    for route in &plan.routes {
        match per_venue.iter_mut().find(|(id, _)| *id == route.venue_id) {
            Some(entry) => entry.1 += route.quantity,
            None => per_venue.push((route.venue_id.as_str(), route.quantity)),
        }
    }
    for (venue_id, quantity) in per_venue {
        let venue = candidates.iter().find(|c| c.venue.id == venue_id);
        if let Some(candidate) = venue {
            if !candidate.venue.accepts_size(quantity) {
                warnings.push(RoutingWarning::OrderSizeLimit {
                    venue_id: venue_id.to_string(),
                    quantity,
                });
            }
        }
    }

    warnings
}
