//! Market module - depth aggregation, liquidity scoring and impact estimation

pub mod depth_cache;
pub mod impact;
pub mod liquidity;
pub mod memory_gateway;

pub use depth_cache::{Aggregation, DepthCache, DepthKey, VenueFailure};
pub use impact::{impact_ratio, mean_impact, ImpactEstimate, MarketImpactEstimator};
pub use liquidity::{reliability_score, score_depth, LiquidityScore, LiquidityScorer, ScoringParams};
pub use memory_gateway::InMemoryMarketData;
