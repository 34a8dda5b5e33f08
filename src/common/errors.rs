//! Error types for the router core

use thiserror::Error;

/// Result type alias using our SorError
pub type Result<T> = std::result::Result<T, SorError>;

/// Main error type for routing operations
///
/// Only fatal conditions live here. Recoverable conditions (a venue that
/// failed to refresh, an unsupported strategy, an under-filled plan) are
/// reported as [`RoutingWarning`](crate::routing::RoutingWarning)s instead.
#[derive(Error, Debug)]
pub enum SorError {
    /// Request rejected before any work was done
    #[error("Invalid routing request: {0}")]
    InvalidRequest(String),

    /// Every eligible venue failed to produce depth
    #[error("Insufficient market data for {symbol}: all {attempted} venue(s) failed")]
    InsufficientData { symbol: String, attempted: usize },

    /// Venue ID not present in the registry
    #[error("Venue not found: {0}")]
    VenueNotFound(String),

    /// No depth snapshot could be obtained for a venue/symbol pair
    #[error("Depth unavailable for {venue}/{symbol}")]
    DepthUnavailable { venue: String, symbol: String },

    /// Market data gateway errors
    #[error("Market data gateway error: {0}")]
    Gateway(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Plan ID not tracked
    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// Lifecycle transition out of a terminal state
    #[error("Invalid plan transition: {0}")]
    InvalidTransition(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::time::error::Elapsed> for SorError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        SorError::Timeout(err.to_string())
    }
}

impl From<config::ConfigError> for SorError {
    fn from(err: config::ConfigError) -> Self {
        SorError::Configuration(err.to_string())
    }
}
