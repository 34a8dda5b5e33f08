//! Allocation algorithms, one per supported routing strategy

mod best_price;
mod min_impact;
mod twap;
mod vwap;

pub use best_price::BestPriceAllocator;
pub use min_impact::MinImpactAllocator;
pub use twap::{twap_slices, TwapAllocator};
pub use vwap::VwapAllocator;
