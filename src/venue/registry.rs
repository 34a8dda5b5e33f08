//! Venue registry
//!
//! Read-mostly store of venue attributes. Writers build a new snapshot and
//! swap it in; readers clone the `Arc` and work on a consistent view.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::common::errors::{Result, SorError};
use crate::common::types::{Venue, VenueId};

#[derive(Debug, Default, Clone)]
struct Snapshot {
    /// Venues in registration order
    venues: Vec<Venue>,
    /// Position of each venue in `venues`
    index: HashMap<VenueId, usize>,
}

/// Concurrency-safe registry of tradable venues
#[derive(Debug, Default)]
pub struct VenueRegistry {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl VenueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured venues, in configuration order
    pub fn from_config(venues: &[Venue]) -> Self {
        let registry = Self::new();
        for venue in venues {
            registry.register(venue.clone());
        }
        info!("Venue registry loaded with {} venues", registry.len());
        registry
    }

    /// Register a venue, replacing any existing entry with the same ID
    ///
    /// A replaced venue keeps its original registration position.
    pub fn register(&self, venue: Venue) {
        let mut guard = self.snapshot.write();
        let mut next = (**guard).clone();

        match next.index.get(&venue.id) {
            Some(&pos) => {
                debug!("Replacing venue {}", venue.id);
                next.venues[pos] = venue;
            }
            None => {
                debug!("Registering venue {}", venue.id);
                next.index.insert(venue.id.clone(), next.venues.len());
                next.venues.push(venue);
            }
        }

        *guard = Arc::new(next);
    }

    /// Toggle the active flag, the only attribute mutable after registration
    pub fn set_active(&self, venue_id: &str, active: bool) -> Result<()> {
        let mut guard = self.snapshot.write();
        let pos = *guard
            .index
            .get(venue_id)
            .ok_or_else(|| SorError::VenueNotFound(venue_id.to_string()))?;

        let mut next = (**guard).clone();
        next.venues[pos].is_active = active;
        *guard = Arc::new(next);

        info!("Venue {} active={}", venue_id, active);
        Ok(())
    }

    /// Look up a venue by ID
    pub fn get(&self, venue_id: &str) -> Option<Venue> {
        let snapshot = self.snapshot.read().clone();
        snapshot
            .index
            .get(venue_id)
            .map(|&pos| snapshot.venues[pos].clone())
    }

    /// Venues eligible for routing, in registration order
    ///
    /// Inactive venues are always excluded, dark pools unless
    /// `allow_dark_pool` is set. A non-empty `filter` is intersected with
    /// the result. An empty result is not an error.
    pub fn active_venues(&self, allow_dark_pool: bool, filter: &[VenueId]) -> Vec<Venue> {
        let snapshot = self.snapshot.read().clone();
        snapshot
            .venues
            .iter()
            .filter(|v| v.is_active)
            .filter(|v| allow_dark_pool || !v.is_dark_pool)
            .filter(|v| filter.is_empty() || filter.iter().any(|id| id == &v.id))
            .cloned()
            .collect()
    }

    /// All registered venues, in registration order
    pub fn all(&self) -> Vec<Venue> {
        self.snapshot.read().venues.clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.read().venues.is_empty()
    }
}
