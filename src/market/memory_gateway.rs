//! In-memory market data gateway
//!
//! Serves depth snapshots seeded from configuration or pushed by a caller.
//! Used by the CLI and by tests in place of a live feed handler.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::time::Instant;

use super::depth_cache::DepthKey;
use crate::common::errors::{Result, SorError};
use crate::common::traits::MarketDataGateway;
use crate::common::types::MarketDepth;

/// Gateway backed by a map of snapshots
#[derive(Debug, Default)]
pub struct InMemoryMarketData {
    snapshots: RwLock<HashMap<DepthKey, MarketDepth>>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of snapshots
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = MarketDepth>) -> Self {
        let gateway = Self::new();
        for depth in snapshots {
            gateway.publish(depth);
        }
        gateway
    }

    /// Insert or replace the snapshot for the depth's (venue, symbol)
    pub fn publish(&self, depth: MarketDepth) {
        let key = (depth.venue_id.clone(), depth.symbol.clone());
        self.snapshots.write().insert(key, depth);
    }

    /// Remove a snapshot so later requests for it fail
    pub fn withdraw(&self, venue_id: &str, symbol: &str) {
        self.snapshots
            .write()
            .remove(&(venue_id.to_string(), symbol.to_string()));
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

#[async_trait]
impl MarketDataGateway for InMemoryMarketData {
    async fn latest_depth(
        &self,
        venue_id: &str,
        symbol: &str,
        _deadline: Instant,
    ) -> Result<MarketDepth> {
        let key = (venue_id.to_string(), symbol.to_string());
        let mut depth = self
            .snapshots
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| SorError::DepthUnavailable {
                venue: venue_id.to_string(),
                symbol: symbol.to_string(),
            })?;
        depth.timestamp = Utc::now();
        Ok(depth)
    }

    fn gateway_name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::PriceLevel;
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_publish_and_fetch() {
        let gateway = InMemoryMarketData::from_snapshots(vec![MarketDepth::new("XNAS", "AAPL")
            .with_asks(vec![PriceLevel::new(dec!(100), 10)])]);

        let depth = assert_ok!(gateway.latest_depth("XNAS", "AAPL", Instant::now()).await);
        assert_eq!(depth.asks.len(), 1);

        gateway.withdraw("XNAS", "AAPL");
        let err = assert_err!(gateway.latest_depth("XNAS", "AAPL", Instant::now()).await);
        assert!(matches!(err, SorError::DepthUnavailable { .. }));
        assert!(gateway.is_empty());
    }
}
