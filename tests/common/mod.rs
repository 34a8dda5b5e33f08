//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sor_engine::config::RouterSettings;
use sor_engine::{
    InMemoryMarketData, MarketDataGateway, MarketDepth, PriceLevel, Result, SmartOrderRouter,
    SorError, Venue, VenueRegistry,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SYMBOL: &str = "AAPL";

/// Depth with a single ask and bid level plus 24h volume
pub fn book(venue: &str, ask: (Decimal, u64), bid: (Decimal, u64), volume: Decimal) -> MarketDepth {
    MarketDepth::new(venue, SYMBOL)
        .with_asks(vec![PriceLevel::new(ask.0, ask.1)])
        .with_bids(vec![PriceLevel::new(bid.0, bid.1)])
        .with_volume(volume)
}

/// Venue A: 500 @ 100.0, 10 bps. Venue B: 300 @ 100.5, 20 bps.
pub fn two_venue_registry() -> Arc<VenueRegistry> {
    Arc::new(VenueRegistry::from_config(&[
        Venue::new("A", "Venue A").with_fee_rate(dec!(0.001)),
        Venue::new("B", "Venue B").with_fee_rate(dec!(0.002)),
    ]))
}

pub fn two_venue_books() -> Vec<MarketDepth> {
    vec![
        book("A", (dec!(100.0), 500), (dec!(99.9), 400), dec!(600000)),
        book("B", (dec!(100.5), 300), (dec!(99.8), 200), dec!(400000)),
    ]
}

pub fn two_venue_router() -> SmartOrderRouter {
    let gateway = InMemoryMarketData::from_snapshots(two_venue_books());
    SmartOrderRouter::new(
        two_venue_registry(),
        Arc::new(gateway),
        RouterSettings::default(),
    )
}

/// How a [`ScriptedGateway`] answers for one venue
#[derive(Debug, Clone)]
pub enum Script {
    Respond(MarketDepth),
    Delay(Duration, MarketDepth),
    Fail(String),
}

/// Gateway with scripted per-venue behaviour and a call counter
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, venue: &str, script: Script) -> Self {
        self.scripts.insert(venue.to_string(), script);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataGateway for ScriptedGateway {
    async fn latest_depth(
        &self,
        venue_id: &str,
        symbol: &str,
        _deadline: tokio::time::Instant,
    ) -> Result<MarketDepth> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(venue_id) {
            Some(Script::Respond(depth)) => Ok(depth.clone()),
            Some(Script::Delay(delay, depth)) => {
                tokio::time::sleep(*delay).await;
                Ok(depth.clone())
            }
            Some(Script::Fail(reason)) => Err(SorError::Gateway(reason.clone())),
            None => Err(SorError::DepthUnavailable {
                venue: venue_id.to_string(),
                symbol: symbol.to_string(),
            }),
        }
    }

    fn gateway_name(&self) -> &'static str {
        "scripted"
    }
}
