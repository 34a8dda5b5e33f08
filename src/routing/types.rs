use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::common::errors::{Result, SorError};
use crate::common::types::{Side, VenueId};
use crate::market::VenueFailure;

/// Routing strategy requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingStrategy {
    BestPrice,
    Vwap,
    Twap,
    MinImpact,
    /// Percentage of volume
    Pov,
    ImplementationShortfall,
    DarkPool,
}

impl RoutingStrategy {
    /// Wire name, e.g. `BEST_PRICE`
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingStrategy::BestPrice => "BEST_PRICE",
            RoutingStrategy::Vwap => "VWAP",
            RoutingStrategy::Twap => "TWAP",
            RoutingStrategy::MinImpact => "MIN_IMPACT",
            RoutingStrategy::Pov => "POV",
            RoutingStrategy::ImplementationShortfall => "IMPLEMENTATION_SHORTFALL",
            RoutingStrategy::DarkPool => "DARK_POOL",
        }
    }
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingStrategy {
    type Err = SorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(&['-', ' '][..], "_");
        match normalized.as_str() {
            "BEST_PRICE" => Ok(RoutingStrategy::BestPrice),
            "VWAP" => Ok(RoutingStrategy::Vwap),
            "TWAP" => Ok(RoutingStrategy::Twap),
            "MIN_IMPACT" => Ok(RoutingStrategy::MinImpact),
            "POV" => Ok(RoutingStrategy::Pov),
            "IMPLEMENTATION_SHORTFALL" | "IS" => Ok(RoutingStrategy::ImplementationShortfall),
            "DARK_POOL" => Ok(RoutingStrategy::DarkPool),
            other => Err(SorError::InvalidRequest(format!("unknown strategy: {}", other))),
        }
    }
}

/// A parent order to be split across venues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRequest {
    pub parent_order_id: String,
    pub symbol: String,
    pub side: Side,
    /// Total quantity in lots
    pub quantity: u64,
    pub strategy: RoutingStrategy,
    /// Maximum number of venues to consider (0 = no limit)
    #[serde(default)]
    pub max_venues: usize,
    /// Minimum acceptable filled/requested ratio
    #[serde(default)]
    pub min_fill_rate: Decimal,
    /// Maximum relative distance between average and best quoted price (0 = unchecked)
    #[serde(default)]
    pub max_slippage: Decimal,
    /// Time budget for depth aggregation
    pub time_limit_ms: u64,
    #[serde(default)]
    pub allow_dark_pool: bool,
    /// Restrict routing to these venues (empty = all eligible)
    #[serde(default)]
    pub venue_filter: Vec<VenueId>,
}

impl RoutingRequest {
    /// Create a best-price request with a 500ms time limit
    pub fn new(symbol: impl Into<String>, side: Side, quantity: u64) -> Self {
        Self {
            parent_order_id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            quantity,
            strategy: RoutingStrategy::BestPrice,
            max_venues: 0,
            min_fill_rate: Decimal::ZERO,
            max_slippage: Decimal::ZERO,
            time_limit_ms: 500,
            allow_dark_pool: false,
            venue_filter: Vec::new(),
        }
    }

    pub fn with_parent_order(mut self, parent_order_id: impl Into<String>) -> Self {
        self.parent_order_id = parent_order_id.into();
        self
    }

    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_venues(mut self, max_venues: usize) -> Self {
        self.max_venues = max_venues;
        self
    }

    pub fn with_min_fill_rate(mut self, min_fill_rate: Decimal) -> Self {
        self.min_fill_rate = min_fill_rate;
        self
    }

    pub fn with_max_slippage(mut self, max_slippage: Decimal) -> Self {
        self.max_slippage = max_slippage;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit_ms = time_limit.as_millis() as u64;
        self
    }

    pub fn allow_dark_pool(mut self, allow: bool) -> Self {
        self.allow_dark_pool = allow;
        self
    }

    pub fn with_venue_filter(mut self, venues: Vec<VenueId>) -> Self {
        self.venue_filter = venues;
        self
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    /// Reject requests that cannot be routed at all
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(SorError::InvalidRequest("symbol must not be empty".to_string()));
        }
        if self.quantity == 0 {
            return Err(SorError::InvalidRequest("quantity must be positive".to_string()));
        }
        if self.time_limit_ms == 0 {
            return Err(SorError::InvalidRequest("time limit must be positive".to_string()));
        }
        if self.min_fill_rate < Decimal::ZERO || self.min_fill_rate > Decimal::ONE {
            return Err(SorError::InvalidRequest(format!(
                "min fill rate {} outside [0, 1]",
                self.min_fill_rate
            )));
        }
        if self.max_slippage < Decimal::ZERO {
            return Err(SorError::InvalidRequest("max slippage must not be negative".to_string()));
        }
        Ok(())
    }
}

/// A venue-level child order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRoute {
    pub venue_id: VenueId,
    pub venue_name: String,
    pub price: Decimal,
    pub quantity: u64,
    /// Expected probability this child fills in full
    pub fill_probability: Decimal,
    pub fee: Decimal,
    /// 1-based submission priority
    pub priority: u32,
    pub created_at: DateTime<Utc>,
}

impl OrderRoute {
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Plan lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Pending,
    Executing,
    Completed,
    Partial,
    Cancelled,
    Expired,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlanStatus::Pending => "PENDING",
            PlanStatus::Executing => "EXECUTING",
            PlanStatus::Completed => "COMPLETED",
            PlanStatus::Partial => "PARTIAL",
            PlanStatus::Cancelled => "CANCELLED",
            PlanStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// A routing plan for one parent order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SorPlan {
    pub id: Uuid,
    pub parent_order_id: String,
    pub symbol: String,
    pub side: Side,
    /// Quantity requested by the parent order
    pub total_quantity: u64,
    /// Strategy the caller asked for
    pub strategy: RoutingStrategy,
    /// Strategy that actually produced the routes
    pub strategy_used: RoutingStrategy,
    pub routes: Vec<OrderRoute>,
    pub average_price: Decimal,
    pub total_fee: Decimal,
    pub expected_cost: Decimal,
    pub market_impact: Decimal,
    pub confidence: Decimal,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: PlanStatus,
}

impl SorPlan {
    /// Sum of routed quantity
    pub fn routed_quantity(&self) -> u64 {
        self.routes.iter().map(|r| r.quantity).sum()
    }

    /// Requested quantity with no route
    pub fn unrouted_quantity(&self) -> u64 {
        self.total_quantity.saturating_sub(self.routed_quantity())
    }

    /// Routed / requested
    pub fn routed_ratio(&self) -> Decimal {
        if self.total_quantity == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.routed_quantity()) / Decimal::from(self.total_quantity)
    }

    /// Recompute average price, total fee and expected cost from the routes
    ///
    /// Expected cost projects the average price over the requested quantity,
    /// not the routed quantity, so under-routing shows up as cost risk.
    pub fn refresh_aggregates(&mut self) {
        let routed = self.routed_quantity();
        let notional: Decimal = self.routes.iter().map(OrderRoute::notional).sum();

        self.average_price = if routed == 0 {
            Decimal::ZERO
        } else {
            notional / Decimal::from(routed)
        };
        self.total_fee = self.routes.iter().map(|r| r.fee).sum();
        self.expected_cost = self.average_price * Decimal::from(self.total_quantity) + self.total_fee;
    }
}

/// A fill reported by the execution collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub plan_id: Uuid,
    pub route_priority: u32,
    pub venue_id: VenueId,
    pub filled_quantity: u64,
    pub fill_price: Decimal,
    pub fee: Decimal,
    pub slippage: Decimal,
    pub latency_ms: u64,
    pub executed_at: DateTime<Utc>,
}

/// Running execution statistics for a plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub filled_quantity: u64,
    pub average_fill_price: Decimal,
    pub total_fees: Decimal,
    pub average_slippage: Decimal,
    pub reports: usize,
}

impl ExecutionStats {
    /// Fold a fill into the running averages
    pub fn record(&mut self, report: &ExecutionReport) {
        let prev_qty = Decimal::from(self.filled_quantity);
        let fill_qty = Decimal::from(report.filled_quantity);
        let new_qty = prev_qty + fill_qty;

        if new_qty > Decimal::ZERO {
            self.average_fill_price =
                (self.average_fill_price * prev_qty + report.fill_price * fill_qty) / new_qty;
        }

        let prev_reports = Decimal::from(self.reports);
        self.average_slippage =
            (self.average_slippage * prev_reports + report.slippage) / (prev_reports + Decimal::ONE);

        self.filled_quantity += report.filled_quantity;
        self.total_fees += report.fee;
        self.reports += 1;
    }
}

/// Non-fatal conditions encountered while routing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingWarning {
    /// A venue's depth refresh failed or timed out; the venue was dropped
    AggregationFailure { venue_id: VenueId, reason: String },
    /// The requested strategy has no allocator; another one was used
    UnsupportedStrategy {
        requested: RoutingStrategy,
        used: RoutingStrategy,
    },
    /// Eligible venues could not absorb the full quantity
    InsufficientLiquidity { requested: u64, unrouted: u64 },
    /// No venue passed the eligibility filters
    NoEligibleVenues { symbol: String },
    /// VWAP found no volume to weight by
    ZeroVolumeFallback { used: RoutingStrategy },
    BelowMinFillRate { fill_rate: Decimal, minimum: Decimal },
    SlippageExceeded { slippage: Decimal, maximum: Decimal },
    /// A venue's routed total falls outside its order size limits
    OrderSizeLimit { venue_id: VenueId, quantity: u64 },
}

impl std::fmt::Display for RoutingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingWarning::AggregationFailure { venue_id, reason } => {
                write!(f, "depth aggregation failed for {}: {}", venue_id, reason)
            }
            RoutingWarning::UnsupportedStrategy { requested, used } => {
                write!(f, "strategy {} not implemented, used {}", requested, used)
            }
            RoutingWarning::InsufficientLiquidity { requested, unrouted } => write!(
                f,
                "insufficient liquidity: {} of {} left unrouted",
                unrouted, requested
            ),
            RoutingWarning::NoEligibleVenues { symbol } => {
                write!(f, "no eligible venues for {}", symbol)
            }
            RoutingWarning::ZeroVolumeFallback { used } => {
                write!(f, "no 24h volume on eligible venues, used {}", used)
            }
            RoutingWarning::BelowMinFillRate { fill_rate, minimum } => write!(
                f,
                "routed fill rate {} below minimum {}",
                fill_rate.round_dp(4),
                minimum
            ),
            RoutingWarning::SlippageExceeded { slippage, maximum } => write!(
                f,
                "expected slippage {} exceeds maximum {}",
                slippage.round_dp(6),
                maximum
            ),
            RoutingWarning::OrderSizeLimit { venue_id, quantity } => write!(
                f,
                "quantity {} at {} is outside the venue order size limits",
                quantity, venue_id
            ),
        }
    }
}

impl From<VenueFailure> for RoutingWarning {
    fn from(failure: VenueFailure) -> Self {
        RoutingWarning::AggregationFailure {
            venue_id: failure.venue_id,
            reason: failure.reason,
        }
    }
}

/// A generated plan with execution statistics and warnings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub plan: SorPlan,
    pub stats: ExecutionStats,
    pub warnings: Vec<RoutingWarning>,
}

impl RoutingResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
