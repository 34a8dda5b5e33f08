//! Trait definitions for external collaborators

use async_trait::async_trait;
use tokio::time::Instant;

#[cfg(test)]
use mockall::automock;

use super::errors::Result;
use super::types::MarketDepth;

/// Source of venue depth snapshots
///
/// The router core only reads from this collaborator. Implementations may
/// talk to a feed handler, a venue REST endpoint, or an in-process cache.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Fetch the latest depth for a symbol at a venue
    ///
    /// # Arguments
    /// * `venue_id` - Venue to query
    /// * `symbol` - Instrument symbol
    /// * `deadline` - Point after which the caller no longer waits
    ///
    /// Callers also enforce the deadline themselves, so an implementation
    /// that ignores it is still bounded.
    async fn latest_depth(
        &self,
        venue_id: &str,
        symbol: &str,
        deadline: Instant,
    ) -> Result<MarketDepth>;

    /// Name used in logs
    fn gateway_name(&self) -> &'static str {
        "market-data"
    }
}
