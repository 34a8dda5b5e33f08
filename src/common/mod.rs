//! Common module - types, errors and collaborator traits shared by all components

pub mod errors;
pub mod traits;
pub mod types;
