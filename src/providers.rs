//! External collaborators a live trip depends on.
//!
//! The engine consumes these as given and never talks to a network itself.
//! Each trait is async so real implementations can sit on an HTTP client.

use crate::conditions::{CongestionLevel, WeatherCondition};
use crate::error::TripError;
use crate::geo::{Coordinate, ManeuverStep};
use crate::track::TrackCandidate;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the routing provider returns for one origin/destination pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfo {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Encoded geometry, passed through untouched
    #[serde(default)]
    pub polyline: String,
    #[serde(default)]
    pub congestion_samples: Vec<CongestionLevel>,
    pub steps: Vec<ManeuverStep>,
}

/// Current weather at a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub condition: WeatherCondition,
    pub description: String,
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current fix.
    ///
    /// # Errors
    ///
    /// [`TripError::GeolocationUnavailable`] when permission is denied or no
    /// fix can be obtained.
    async fn current_position(&self) -> Result<Coordinate, TripError>;
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteInfo>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_weather(&self, at: Coordinate) -> Result<WeatherReport>;
}

#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// The listener's library. An empty list means "nothing usable".
    async fn tracks(&self) -> Result<Vec<TrackCandidate>>;
}

/// Catalog backed by a fixed list, e.g. a JSON export
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tracks: Vec<TrackCandidate>,
}

impl StaticCatalog {
    #[must_use]
    pub const fn new(tracks: Vec<TrackCandidate>) -> Self {
        Self { tracks }
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn tracks(&self) -> Result<Vec<TrackCandidate>> {
        Ok(self.tracks.clone())
    }
}

/// Everything [`crate::session::TripEngine::start_live`] needs
pub struct LiveProviders<'a> {
    pub location: &'a dyn LocationProvider,
    pub routing: &'a dyn RoutingProvider,
    pub weather: &'a dyn WeatherProvider,
    pub catalog: &'a dyn CatalogProvider,
}
