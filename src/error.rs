//! # Error Taxonomy
//!
//! Typed errors for the trip engine. Application glue (CLI, config files,
//! SQLite plumbing) keeps using `anyhow`; the engine itself reports through
//! these enums so callers can decide what is fatal and what is recoverable:
//!
//! - [`TripError::GeolocationUnavailable`] and [`TripError::RouteUnavailable`]
//!   abort a live trip start.
//! - [`TripError::ConditionsUnavailable`] degrades to an `unknown` snapshot.
//! - [`RecommendationError`] is recovered locally by the orchestrator.
//! - [`TripError::FeedbackWrite`] is logged and swallowed.

use thiserror::Error;

/// Errors raised while producing or validating a recommendation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecommendationError {
    /// The recommender answered, but without a usable index list
    #[error("Malformed recommender response: {0}")]
    MalformedResponse(String),

    /// The recommender could not be reached or refused the request
    #[error("Recommender failed: {0}")]
    Upstream(String),

    /// There was nothing to recommend from
    #[error("Candidate pool is empty")]
    EmptyPool,
}

/// Errors from position arithmetic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Latitude/longitude is NaN, infinite, or outside WGS84 bounds
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

/// Errors surfaced by a trip session.
#[derive(Error, Debug)]
pub enum TripError {
    /// Location permission denied or no fix available
    #[error("Geolocation unavailable: {0}")]
    GeolocationUnavailable(String),

    /// Routing collaborator failed or returned an empty route
    #[error("Route unavailable: {0}")]
    RouteUnavailable(String),

    /// Weather lookup failed
    #[error("Conditions unavailable: {0}")]
    ConditionsUnavailable(String),

    /// Recommendation could not be produced
    #[error(transparent)]
    Recommendation(#[from] RecommendationError),

    /// Feedback event could not be persisted
    #[error("Feedback write failed: {0}")]
    FeedbackWrite(String),

    /// Bad position input
    #[error(transparent)]
    Geo(#[from] GeoError),
}

/// Result alias for engine operations
pub type TripResult<T> = std::result::Result<T, TripError>;
