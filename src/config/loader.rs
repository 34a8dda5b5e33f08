//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{Result, SorError};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with SOR__, e.g. SOR__ROUTER__DEPTH_TTL_MS)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("SOR")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let app_config: AppConfig = config.try_deserialize()?;
    validate(&app_config)?;
    Ok(app_config)
}

/// Load configuration from a TOML string
pub fn load_from_str(toml: &str) -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    validate(&app_config)?;
    Ok(app_config)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.router.twap_intervals == 0 {
        return Err(SorError::Configuration(
            "router.twap_intervals must be at least 1".to_string(),
        ));
    }

    if config.router.min_impact_participation <= rust_decimal::Decimal::ZERO {
        return Err(SorError::Configuration(
            "router.min_impact_participation must be positive".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for venue in &config.venues {
        if !seen.insert(venue.id.as_str()) {
            return Err(SorError::Configuration(format!(
                "duplicate venue id: {}",
                venue.id
            )));
        }
    }

    Ok(())
}
