//! SOR Engine Library
//!
//! Smart order router core: splits a parent order across trading venues
//! using aggregated market depth, liquidity scores and a pluggable routing
//! strategy, then tracks the resulting plan through execution.

pub mod common;
pub mod config;
pub mod market;
pub mod routing;
pub mod service;
pub mod venue;

// Re-export commonly used types
pub use common::errors::{Result, SorError};
pub use common::traits::MarketDataGateway;
pub use common::types::{MarketDepth, PriceLevel, Side, Venue, VenueId};
pub use config::types::AppConfig;
pub use market::{DepthCache, ImpactEstimate, InMemoryMarketData, LiquidityScore};
pub use service::SmartOrderRouter;
pub use venue::VenueRegistry;

// Routing types
pub use routing::{
    Allocator, BoxedAllocator, ExecutionReport, ExecutionStats, OrderRoute, PlanStatus,
    PlanTracker, RoutingRequest, RoutingResult, RoutingStrategy, RoutingWarning, SorPlan,
};
