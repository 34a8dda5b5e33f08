//! Route planning
//!
//! Turns a [`RoutingRequest`] plus the depths aggregated for it into a
//! [`SorPlan`] of venue-level child orders.
//!
//! # Architecture
//!
//! ```text
//! Candidates ──► RoutingPlanner ──► Allocator (per strategy) ──► SorPlan
//!                                                                   │
//!                               PlanTracker ◄── RouteOptimizer ◄────┘
//! ```
//!
//! # Strategies
//!
//! - `BEST_PRICE` - greedy consumption of the merged price ladder
//! - `VWAP` - split proportional to 24h volume
//! - `TWAP` - equal slices released over time on one venue
//! - `MIN_IMPACT` - least impacted venues first, capped participation
//!
//! Other strategies are accepted and routed with `BEST_PRICE`.

pub mod allocators;
pub mod lifecycle;
pub mod optimizer;
pub mod planner;
pub mod traits;
pub mod types;

pub use allocators::{BestPriceAllocator, MinImpactAllocator, TwapAllocator, VwapAllocator};
pub use lifecycle::{report_channel, PlanTracker};
pub use optimizer::RouteOptimizer;
pub use planner::RoutingPlanner;
pub use traits::{Allocation, AllocationContext, Allocator, BoxedAllocator, Candidate};
pub use types::{
    ExecutionReport, ExecutionStats, OrderRoute, PlanStatus, RoutingRequest, RoutingResult,
    RoutingStrategy, RoutingWarning, SorPlan,
};
