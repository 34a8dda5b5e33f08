//! Venue module - registry of tradable destinations

pub mod registry;

pub use registry::VenueRegistry;
