//! Domain error types.
//!
//! These errors represent invalid requests against the static route and
//! stop configuration. They are distinct from feed/IO errors.

use super::StopId;

/// Domain-level errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    /// The stop id is well-formed but not on the route
    #[error("unknown stop: {0}")]
    UnknownStop(StopId),

    /// A stop id failed validation
    #[error(transparent)]
    InvalidStopId(#[from] super::InvalidStopId),

    /// Coordinates outside the valid latitude/longitude range
    #[error("invalid coordinates: lat {lat}, lng {lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },
}
