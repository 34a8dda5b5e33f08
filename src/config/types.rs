//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::types::{MarketDepth, PriceLevel, Venue};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Router tunables
    #[serde(default)]
    pub router: RouterSettings,
    /// Venues loaded into the registry at startup
    #[serde(default)]
    pub venues: Vec<Venue>,
    /// Depth snapshots used to seed the in-memory market data gateway
    #[serde(default)]
    pub market_data: Vec<DepthSnapshotConfig>,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Tunables for caching, scoring and allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Age after which a cached depth snapshot is refreshed
    #[serde(default = "default_depth_ttl")]
    pub depth_ttl_ms: u64,
    /// Age after which a cached liquidity score is recomputed
    #[serde(default = "default_score_ttl")]
    pub score_ttl_ms: u64,
    /// Displayed quantity that maps to a depth sub-score of 1.0
    #[serde(default = "default_depth_normalization")]
    pub depth_normalization: Decimal,
    /// 24h volume that maps to a volume sub-score of 1.0
    #[serde(default = "default_volume_normalization")]
    pub volume_normalization: Decimal,
    /// Number of TWAP slices
    #[serde(default = "default_twap_intervals")]
    pub twap_intervals: u32,
    /// Spacing between consecutive TWAP slice release times
    #[serde(default = "default_twap_slice_interval")]
    pub twap_slice_interval_ms: u64,
    /// Fraction of a venue's available liquidity MinImpact may take
    #[serde(default = "default_min_impact_participation")]
    pub min_impact_participation: Decimal,
    /// Lifetime of a generated plan
    #[serde(default = "default_plan_ttl")]
    pub plan_ttl_secs: u64,
    /// How long a closed plan stays queryable before the tracker drops it
    #[serde(default = "default_plan_retention")]
    pub plan_retention_secs: u64,
    /// Time budget for operations that carry no request deadline
    #[serde(default = "default_time_limit")]
    pub default_time_limit_ms: u64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            depth_ttl_ms: default_depth_ttl(),
            score_ttl_ms: default_score_ttl(),
            depth_normalization: default_depth_normalization(),
            volume_normalization: default_volume_normalization(),
            twap_intervals: default_twap_intervals(),
            twap_slice_interval_ms: default_twap_slice_interval(),
            min_impact_participation: default_min_impact_participation(),
            plan_ttl_secs: default_plan_ttl(),
            plan_retention_secs: default_plan_retention(),
            default_time_limit_ms: default_time_limit(),
        }
    }
}

impl RouterSettings {
    pub fn depth_ttl(&self) -> Duration {
        Duration::from_millis(self.depth_ttl_ms)
    }

    pub fn score_ttl(&self) -> Duration {
        Duration::from_millis(self.score_ttl_ms)
    }

    pub fn default_time_limit(&self) -> Duration {
        Duration::from_millis(self.default_time_limit_ms)
    }

    pub fn plan_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.plan_ttl_secs as i64)
    }

    pub fn plan_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.plan_retention_secs as i64)
    }

    pub fn twap_slice_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.twap_slice_interval_ms as i64)
    }
}

fn default_depth_ttl() -> u64 {
    1000
}

fn default_score_ttl() -> u64 {
    5000
}

fn default_depth_normalization() -> Decimal {
    dec!(10000)
}

fn default_volume_normalization() -> Decimal {
    dec!(1000000)
}

fn default_twap_intervals() -> u32 {
    10
}

fn default_twap_slice_interval() -> u64 {
    60_000
}

fn default_min_impact_participation() -> Decimal {
    dec!(0.10)
}

fn default_plan_ttl() -> u64 {
    300
}

fn default_plan_retention() -> u64 {
    600
}

fn default_time_limit() -> u64 {
    500
}

/// Seed snapshot for one venue/symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthSnapshotConfig {
    pub venue_id: String,
    pub symbol: String,
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
    #[serde(default)]
    pub volume_24h: Decimal,
    #[serde(default)]
    pub latency_ms: u64,
}

impl From<DepthSnapshotConfig> for MarketDepth {
    fn from(cfg: DepthSnapshotConfig) -> Self {
        MarketDepth::new(cfg.venue_id, cfg.symbol)
            .with_bids(cfg.bids)
            .with_asks(cfg.asks)
            .with_volume(cfg.volume_24h)
            .with_latency(cfg.latency_ms)
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Buffer size of the execution report channel
    #[serde(default = "default_report_channel_size")]
    pub report_channel_size: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            report_channel_size: default_report_channel_size(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_report_channel_size() -> usize {
    crate::routing::lifecycle::DEFAULT_REPORT_CHANNEL_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_defaults() {
        let settings = RouterSettings::default();
        assert_eq!(settings.twap_intervals, 10);
        assert_eq!(settings.min_impact_participation, dec!(0.10));
        assert_eq!(settings.depth_ttl(), Duration::from_millis(1000));
        assert_eq!(settings.plan_ttl(), chrono::Duration::seconds(300));
        assert_eq!(settings.plan_retention(), chrono::Duration::seconds(600));
    }

    #[test]
    fn test_snapshot_conversion_derives_spread() {
        let cfg = DepthSnapshotConfig {
            venue_id: "XNAS".to_string(),
            symbol: "AAPL".to_string(),
            bids: vec![PriceLevel::new(dec!(99.5), 10)],
            asks: vec![PriceLevel::new(dec!(100.0), 10)],
            volume_24h: dec!(5000),
            latency_ms: 3,
        };

        let depth = MarketDepth::from(cfg);
        assert_eq!(depth.spread, dec!(0.5));
        assert_eq!(depth.volume_24h, dec!(5000));
        assert_eq!(depth.latency_ms, 3);
    }
}
