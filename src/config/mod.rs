//! Configuration module - file and environment backed settings

pub mod loader;
pub mod types;

pub use loader::{load_config, load_from_str};
pub use types::{AppConfig, AppSettings, DepthSnapshotConfig, RouterSettings};
