//! Smart order router facade
//!
//! Wires the venue registry, depth cache, scorers, planner, optimizer and
//! plan tracker together behind the four exposed operations.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::common::errors::{Result, SorError};
use crate::common::traits::MarketDataGateway;
use crate::common::types::{MarketDepth, Side, Venue, VenueId};
use crate::config::{AppConfig, RouterSettings};
use crate::market::{
    DepthCache, ImpactEstimate, LiquidityScore, LiquidityScorer, MarketImpactEstimator, ScoringParams,
};
use crate::routing::lifecycle::report_channel;
use crate::routing::{
    Candidate, ExecutionReport, ExecutionStats, PlanTracker, RouteOptimizer, RoutingPlanner,
    RoutingRequest, RoutingResult, RoutingWarning, SorPlan,
};
use crate::venue::VenueRegistry;

pub struct SmartOrderRouter {
    registry: Arc<VenueRegistry>,
    depths: Arc<DepthCache>,
    scorer: LiquidityScorer,
    impact: MarketImpactEstimator,
    planner: RoutingPlanner,
    optimizer: RouteOptimizer,
    tracker: Arc<PlanTracker>,
    settings: RouterSettings,
}

impl SmartOrderRouter {
    pub fn new(
        registry: Arc<VenueRegistry>,
        gateway: Arc<dyn MarketDataGateway>,
        settings: RouterSettings,
    ) -> Self {
        let depths = Arc::new(DepthCache::new(gateway, settings.depth_ttl()));
        let params = ScoringParams {
            depth_normalization: settings.depth_normalization,
            volume_normalization: settings.volume_normalization,
        };

        Self {
            scorer: LiquidityScorer::new(depths.clone(), params, settings.score_ttl()),
            impact: MarketImpactEstimator::new(depths.clone()),
            planner: RoutingPlanner::new(settings.clone()),
            optimizer: RouteOptimizer::new(),
            tracker: Arc::new(PlanTracker::with_retention(settings.plan_retention())),
            registry,
            depths,
            settings,
        }
    }

    /// Build a router from loaded configuration
    pub fn from_config(config: &AppConfig, gateway: Arc<dyn MarketDataGateway>) -> Self {
        let registry = Arc::new(VenueRegistry::from_config(&config.venues));
        Self::new(registry, gateway, config.router.clone())
    }

    pub fn registry(&self) -> &Arc<VenueRegistry> {
        &self.registry
    }

    pub fn depth_cache(&self) -> &Arc<DepthCache> {
        &self.depths
    }

    pub fn tracker(&self) -> &Arc<PlanTracker> {
        &self.tracker
    }

    pub fn planner_mut(&mut self) -> &mut RoutingPlanner {
        &mut self.planner
    }

    /// Generate, optimize and start tracking a plan for `request`
    ///
    /// Depth for every eligible venue is fetched within the request's time
    /// limit. Venues that fail are dropped with a warning; the call only
    /// fails when every eligible venue failed.
    #[instrument(
        skip(self, request),
        fields(parent = %request.parent_order_id, symbol = %request.symbol, strategy = %request.strategy)
    )]
    pub async fn create_routing_plan(&self, request: RoutingRequest) -> Result<RoutingResult> {
        request.validate()?;
        let deadline = Instant::now() + request.time_limit();

        let mut venues = self
            .registry
            .active_venues(request.allow_dark_pool, &request.venue_filter);
        if request.max_venues > 0 {
            venues.truncate(request.max_venues);
        }

        let mut warnings = Vec::new();
        if venues.is_empty() {
            warn!("No eligible venues for {}", request.symbol);
            warnings.push(RoutingWarning::NoEligibleVenues {
                symbol: request.symbol.clone(),
            });
        }

        let venue_ids: Vec<VenueId> = venues.iter().map(|v| v.id.clone()).collect();
        let aggregation = self
            .depths
            .aggregate(&request.symbol, &venue_ids, deadline)
            .await?;
        warnings.extend(aggregation.failures.into_iter().map(RoutingWarning::from));

        let candidates = candidates(venues, aggregation.depths);
        let (plan, plan_warnings) = self.planner.plan(&request, &candidates);
        warnings.extend(plan_warnings);

        let plan = self.optimizer.optimize(plan);
        self.tracker.track(&plan, request.min_fill_rate);

        info!(
            "Plan {} for {} {} {}: {} routes over {} venues, avg {} ({} warnings)",
            plan.id,
            plan.side,
            plan.total_quantity,
            plan.symbol,
            plan.routes.len(),
            candidates.len(),
            plan.average_price.round_dp(6),
            warnings.len()
        );

        Ok(RoutingResult {
            plan,
            stats: ExecutionStats::default(),
            warnings,
        })
    }

    /// Liquidity score for a registered venue
    #[instrument(skip(self))]
    pub async fn calculate_liquidity_score(&self, venue_id: &str, symbol: &str) -> Result<LiquidityScore> {
        if self.registry.get(venue_id).is_none() {
            return Err(SorError::VenueNotFound(venue_id.to_string()));
        }
        let deadline = Instant::now() + self.settings.default_time_limit();
        self.scorer.score(venue_id, symbol, deadline).await
    }

    /// Mean impact of `quantity` across active lit venues
    #[instrument(skip(self))]
    pub async fn estimate_market_impact(
        &self,
        symbol: &str,
        side: Side,
        quantity: u64,
    ) -> Result<ImpactEstimate> {
        let venue_ids: Vec<VenueId> = self
            .registry
            .active_venues(false, &[])
            .into_iter()
            .map(|v| v.id)
            .collect();
        let deadline = Instant::now() + self.settings.default_time_limit();
        self.impact
            .estimate(symbol, side, quantity, &venue_ids, deadline)
            .await
    }

    /// Merge same-venue routes of an existing plan
    pub fn optimize_routes(&self, plan: SorPlan) -> SorPlan {
        self.optimizer.optimize(plan)
    }

    /// Feed execution reports from `receiver` into the plan tracker
    pub fn spawn_report_consumer(&self, receiver: mpsc::Receiver<ExecutionReport>) -> JoinHandle<usize> {
        let tracker = self.tracker.clone();
        tokio::spawn(async move { tracker.run(receiver).await })
    }

    /// Open an execution report channel of `size` with its consumer running
    ///
    /// The consumer finishes once every sender clone is dropped.
    pub fn open_report_channel(&self, size: usize) -> (mpsc::Sender<ExecutionReport>, JoinHandle<usize>) {
        let (tx, rx) = report_channel(size);
        (tx, self.spawn_report_consumer(rx))
    }
}

/// Pair aggregated depths with their venues, keeping aggregation order
fn candidates(venues: Vec<Venue>, depths: Vec<MarketDepth>) -> Vec<Candidate> {
    let mut by_id: HashMap<VenueId, Venue> = venues.into_iter().map(|v| (v.id.clone(), v)).collect();
    depths
        .into_iter()
        .filter_map(|depth| {
            by_id
                .remove(&depth.venue_id)
                .map(|venue| Candidate::new(venue, depth))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::MockMarketDataGateway;
    use crate::common::types::PriceLevel;
    use crate::market::InMemoryMarketData;
    use crate::routing::{PlanStatus, RoutingStrategy};
    use mockall::predicate::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn registry() -> Arc<VenueRegistry> {
        Arc::new(VenueRegistry::from_config(&[
            Venue::new("A", "Venue A").with_fee_rate(dec!(0.001)),
            Venue::new("B", "Venue B").with_fee_rate(dec!(0.002)),
            Venue::new("DARK", "Dark Pool").dark_pool(),
        ]))
    }

    fn book(venue: &str, price: rust_decimal::Decimal, qty: u64) -> MarketDepth {
        MarketDepth::new(venue, "AAPL")
            .with_asks(vec![PriceLevel::new(price, qty)])
            .with_bids(vec![PriceLevel::new(price - dec!(0.1), qty)])
            .with_volume(dec!(50000))
    }

    fn router() -> SmartOrderRouter {
        let gateway = InMemoryMarketData::from_snapshots([
            book("A", dec!(100.0), 500),
            book("B", dec!(100.5), 300),
            book("DARK", dec!(99.0), 1000),
        ]);
        SmartOrderRouter::new(registry(), Arc::new(gateway), RouterSettings::default())
    }

    #[test_log::test(tokio::test)]
    async fn test_create_plan_tracks_it() {
        let router = router();
        let request = RoutingRequest::new("AAPL", Side::Buy, 700);

        let result = router.create_routing_plan(request).await.unwrap();

        assert!(!result.has_warnings());
        assert_eq!(result.plan.routed_quantity(), 700);
        assert!(result.plan.routes.iter().all(|r| r.venue_id != "DARK"));
        assert_eq!(router.tracker().status(result.plan.id).unwrap(), PlanStatus::Pending);
        assert_eq!(result.stats, ExecutionStats::default());
    }

    #[tokio::test]
    async fn test_dark_pool_opt_in_and_max_venues() {
        let router = router();
        let request = RoutingRequest::new("AAPL", Side::Buy, 100)
            .allow_dark_pool(true)
            .with_venue_filter(vec!["DARK".to_string(), "B".to_string()])
            .with_max_venues(1);

        let result = router.create_routing_plan(request).await.unwrap();

        // registration order puts B before DARK
        assert_eq!(result.plan.routes.len(), 1);
        assert_eq!(result.plan.routes[0].venue_id, "B");
    }

    #[tokio::test]
    async fn test_no_eligible_venues_warns() {
        let router = router();
        let request = RoutingRequest::new("AAPL", Side::Buy, 100).with_venue_filter(vec!["NOPE".to_string()]);

        let result = router.create_routing_plan(request).await.unwrap();

        assert!(result.plan.routes.is_empty());
        assert_eq!(result.plan.status, PlanStatus::Partial);
        assert_eq!(
            result.warnings[0],
            RoutingWarning::NoEligibleVenues {
                symbol: "AAPL".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let router = router();
        let err = router
            .create_routing_plan(RoutingRequest::new("AAPL", Side::Buy, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SorError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_liquidity_score_unknown_venue() {
        let router = router();
        let err = router.calculate_liquidity_score("ZZZ", "AAPL").await.unwrap_err();
        assert!(matches!(err, SorError::VenueNotFound(_)));

        let score = router.calculate_liquidity_score("A", "AAPL").await.unwrap();
        assert_eq!(score.venue_id, "A");
    }

    #[tokio::test]
    async fn test_impact_ignores_dark_pools() {
        let router = router();
        let estimate = router.estimate_market_impact("AAPL", Side::Buy, 150).await.unwrap();

        assert_eq!(estimate.venues_considered, 2);
        assert_eq!(estimate.ratio, (dec!(150) / dec!(500) + dec!(150) / dec!(300)) / dec!(2));
    }

    #[tokio::test]
    async fn test_failed_venue_becomes_warning() {
        let mut gateway = MockMarketDataGateway::new();
        gateway.expect_gateway_name().return_const("mock");
        gateway
            .expect_latest_depth()
            .with(eq("A"), eq("AAPL"), always())
            .returning(|_, _, _| Ok(book("A", dec!(100.0), 500)));
        gateway
            .expect_latest_depth()
            .with(eq("B"), eq("AAPL"), always())
            .returning(|_, _, _| Err(SorError::Gateway("feed down".to_string())));

        let router = SmartOrderRouter::new(registry(), Arc::new(gateway), RouterSettings::default());
        let request = RoutingRequest::new("AAPL", Side::Buy, 200).with_strategy(RoutingStrategy::Vwap);

        let result = router.create_routing_plan(request).await.unwrap();

        assert_eq!(result.plan.routed_quantity(), 200);
        assert_eq!(result.warnings.len(), 1);
        assert!(matches!(
            &result.warnings[0],
            RoutingWarning::AggregationFailure { venue_id, .. } if venue_id == "B"
        ));
    }

    #[tokio::test]
    async fn test_report_consumer_updates_tracker() {
        let router = router();
        let result = router
            .create_routing_plan(RoutingRequest::new("AAPL", Side::Buy, 100))
            .await
            .unwrap();
        let route = result.plan.routes[0].clone();

        let (tx, handle) = router.open_report_channel(8);
        tx.send(ExecutionReport {
            plan_id: result.plan.id,
            route_priority: route.priority,
            venue_id: route.venue_id.clone(),
            filled_quantity: route.quantity,
            fill_price: route.price,
            fee: route.fee,
            slippage: rust_decimal::Decimal::ZERO,
            latency_ms: 2,
            executed_at: chrono::Utc::now(),
        })
        .await
        .unwrap();
        drop(tx);

        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(router.tracker().status(result.plan.id).unwrap(), PlanStatus::Completed);
    }
}
