//! Medicine Order Domain Models

/// Order session aggregate
pub mod orders;

/// Receipt rendering
pub mod receipt;

/// Receipt delivery
pub mod delivery;

/// Runtime configuration
pub mod config;

/// Domain errors
pub mod errors;

/// Domain events wrapper
pub mod event;

pub use errors::Error;
pub use event::DomainEvent;
