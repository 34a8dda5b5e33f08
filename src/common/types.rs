//! Market types shared by every router component

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::SorError;

/// Venue identifier
pub type VenueId = String;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = SorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Ok(Side::Buy),
            "SELL" | "S" => Ok(Side::Sell),
            other => Err(SorError::InvalidRequest(format!("unknown side: {}", other))),
        }
    }
}

/// A single price level in a book side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price at this level
    pub price: Decimal,
    /// Total resting quantity at this price
    pub quantity: u64,
    /// Number of orders resting at this price
    #[serde(default)]
    pub order_count: u32,
}

impl PriceLevel {
    /// Create a new price level
    pub fn new(price: Decimal, quantity: u64) -> Self {
        Self {
            price,
            quantity,
            order_count: 1,
        }
    }

    pub fn with_orders(mut self, order_count: u32) -> Self {
        self.order_count = order_count;
        self
    }
}

/// Depth snapshot for one symbol at one venue
///
/// Owned by the depth cache and replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDepth {
    /// Venue this snapshot is from
    pub venue_id: VenueId,
    /// Instrument symbol
    pub symbol: String,
    /// Bid levels sorted by price descending
    pub bids: Vec<PriceLevel>,
    /// Ask levels sorted by price ascending
    pub asks: Vec<PriceLevel>,
    /// Traded volume over the last 24 hours
    #[serde(default)]
    pub volume_24h: Decimal,
    /// Quoted spread as reported by the feed
    #[serde(default)]
    pub spread: Decimal,
    /// Observed feed latency in milliseconds
    #[serde(default)]
    pub latency_ms: u64,
    /// Capture time of this snapshot
    pub timestamp: DateTime<Utc>,
}

impl MarketDepth {
    /// Create an empty snapshot stamped now
    pub fn new(venue_id: impl Into<VenueId>, symbol: impl Into<String>) -> Self {
        Self {
            venue_id: venue_id.into(),
            symbol: symbol.into(),
            bids: Vec::new(),
            asks: Vec::new(),
            volume_24h: Decimal::ZERO,
            spread: Decimal::ZERO,
            latency_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_bids(mut self, bids: Vec<PriceLevel>) -> Self {
        self.bids = bids;
        self.spread = self.computed_spread().unwrap_or(self.spread);
        self
    }

    pub fn with_asks(mut self, asks: Vec<PriceLevel>) -> Self {
        self.asks = asks;
        self.spread = self.computed_spread().unwrap_or(self.spread);
        self
    }

    pub fn with_volume(mut self, volume_24h: Decimal) -> Self {
        self.volume_24h = volume_24h;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Get the best bid level (highest buy order)
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Get the best ask level (lowest sell order)
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Levels an order on `side` would trade against
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    /// Best price an order on `side` can trade at
    pub fn best_price(&self, side: Side) -> Option<Decimal> {
        self.levels(side).first().map(|level| level.price)
    }

    /// Total quantity an order on `side` can consume
    pub fn available_liquidity(&self, side: Side) -> u64 {
        self.levels(side).iter().map(|level| level.quantity).sum()
    }

    /// Displayed quantity across both sides of the book
    pub fn total_displayed_quantity(&self) -> u64 {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .map(|level| level.quantity)
            .sum()
    }

    fn computed_spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }
}

/// A tradable destination and its static attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub currency: String,
    /// Mean round-trip latency in milliseconds
    #[serde(default)]
    pub latency_ms: u64,
    /// Taker fee as a fraction of notional (0.001 = 10 bps)
    #[serde(default)]
    pub fee_rate: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_dark_pool: bool,
    #[serde(default)]
    pub min_order_size: u64,
    /// Maximum child order size (None = unlimited)
    #[serde(default)]
    pub max_order_size: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Venue {
    /// Create an active, lit venue with no fees
    pub fn new(id: impl Into<VenueId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            region: String::new(),
            currency: String::new(),
            latency_ms: 0,
            fee_rate: Decimal::ZERO,
            is_active: true,
            is_dark_pool: false,
            min_order_size: 0,
            max_order_size: None,
        }
    }

    pub fn with_fee_rate(mut self, fee_rate: Decimal) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_location(mut self, region: impl Into<String>, currency: impl Into<String>) -> Self {
        self.region = region.into();
        self.currency = currency.into();
        self
    }

    pub fn with_size_limits(mut self, min: u64, max: Option<u64>) -> Self {
        self.min_order_size = min;
        self.max_order_size = max;
        self
    }

    pub fn dark_pool(mut self) -> Self {
        self.is_dark_pool = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Fee charged on a fill of `quantity` at `price`
    pub fn fee_for(&self, price: Decimal, quantity: u64) -> Decimal {
        price * Decimal::from(quantity) * self.fee_rate
    }

    /// Whether `quantity` respects this venue's order size limits
    pub fn accepts_size(&self, quantity: u64) -> bool {
        quantity >= self.min_order_size && self.max_order_size.map_or(true, |max| quantity <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_depth() -> MarketDepth {
        MarketDepth::new("XNAS", "AAPL")
            .with_bids(vec![
                PriceLevel::new(dec!(99.90), 300),
                PriceLevel::new(dec!(99.80), 200),
            ])
            .with_asks(vec![
                PriceLevel::new(dec!(100.00), 500),
                PriceLevel::new(dec!(100.10), 100),
            ])
    }

    #[test]
    fn test_depth_side_selection() {
        let depth = sample_depth();

        assert_eq!(depth.best_price(Side::Buy), Some(dec!(100.00)));
        assert_eq!(depth.best_price(Side::Sell), Some(dec!(99.90)));
        assert_eq!(depth.available_liquidity(Side::Buy), 600);
        assert_eq!(depth.available_liquidity(Side::Sell), 500);
        assert_eq!(depth.total_displayed_quantity(), 1100);
        assert_eq!(depth.spread, dec!(0.10));
    }

    #[test]
    fn test_empty_depth() {
        let depth = MarketDepth::new("XNAS", "AAPL");

        assert!(depth.best_bid().is_none());
        assert!(depth.best_price(Side::Buy).is_none());
        assert_eq!(depth.available_liquidity(Side::Sell), 0);
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!(" SELL ".parse::<Side>().unwrap(), Side::Sell);
        assert!("hold".parse::<Side>().is_err());
    }

    #[test]
    fn test_venue_fee_and_size_limits() {
        let venue = Venue::new("ARCA", "NYSE Arca")
            .with_fee_rate(dec!(0.001))
            .with_size_limits(10, Some(1000));

        assert_eq!(venue.fee_for(dec!(100), 50), dec!(5.000));
        assert!(venue.accepts_size(10));
        assert!(!venue.accepts_size(5));
        assert!(!venue.accepts_size(1001));
    }
}
