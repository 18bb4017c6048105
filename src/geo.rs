//! # Geographic Progress Tracking
//!
//! Positions, maneuver steps and the tracker that decides when the driver has
//! reached the current maneuver.
//!
//! ## Advancement Rule
//!
//! ```text
//! d = haversine(position, steps[current].location)
//! next = current + 1   if d < threshold and current < len - 1
//! next = current       otherwise
//! ```
//!
//! The tracker is pure. The caller owns the step index and writes back the
//! returned value, which never decreases and never passes the last step.

use crate::error::GeoError;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject NaN, infinities and out-of-range degrees
    pub fn validate(&self) -> Result<(), GeoError> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lng_ok = self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng);
        match lat_ok && lng_ok {
            true => Ok(()),
            false => Err(GeoError::InvalidCoordinate { lat: self.lat, lng: self.lng }),
        }
    }

    /// Great-circle distance to `other` in meters.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidCoordinate`] if either endpoint is malformed.
    pub fn distance_to(&self, other: &Coordinate) -> Result<f64, GeoError> {
        self.validate()?;
        other.validate()?;
        Ok(haversine_m(self, other))
    }
}

/// Haversine distance in meters. Inputs are assumed valid.
#[must_use]
pub fn haversine_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// One turn-by-turn instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManeuverStep {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub instruction_text: String,
    /// Provider maneuver type, e.g. "turn", "depart", "arrive"
    pub maneuver_type: String,
    /// "left", "slight right", ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maneuver_modifier: Option<String>,
    pub location: Coordinate,
}

/// Outcome of one [`GeoProgressTracker::advance`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepProgress {
    /// Meters to the current maneuver, `None` when there is no step to measure
    pub distance_to_next_maneuver: Option<f64>,
    pub next_index: usize,
}

/// Decides when a maneuver has been reached
#[derive(Debug, Clone, Copy)]
pub struct GeoProgressTracker {
    proximity_threshold_m: f64,
}

impl Default for GeoProgressTracker {
    fn default() -> Self {
        Self { proximity_threshold_m: 20.0 }
    }
}

impl GeoProgressTracker {
    #[must_use]
    pub const fn new(proximity_threshold_m: f64) -> Self {
        Self { proximity_threshold_m }
    }

    #[must_use]
    pub const fn proximity_threshold_m(&self) -> f64 {
        self.proximity_threshold_m
    }

    /// Measure distance to `steps[current_index]` and advance if close enough.
    ///
    /// Empty `steps` or an out-of-range index is a no-op: the index comes back
    /// unchanged with no distance.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidCoordinate`] for a malformed position or
    /// maneuver location. The caller must keep its current index in that case.
    pub fn advance(
        &self,
        position: &Coordinate,
        steps: &[ManeuverStep],
        current_index: usize,
    ) -> Result<StepProgress, GeoError> {
        let Some(step) = steps.get(current_index) else {
            return Ok(StepProgress { distance_to_next_maneuver: None, next_index: current_index });
        };

        let distance = position.distance_to(&step.location)?;
        let is_last = current_index + 1 >= steps.len();

        let next_index = match distance < self.proximity_threshold_m && !is_last {
            true => {
                log::info!(
                    "Completed step {}/{} ({:.1}m from maneuver)",
                    current_index + 1,
                    steps.len(),
                    distance
                );
                current_index + 1
            }
            false => current_index,
        };

        Ok(StepProgress { distance_to_next_maneuver: Some(distance), next_index })
    }
}

/// Human readable distance: `45m`, `320m`, `1.2km`
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if meters < 100.0 {
        format!("{}m", meters.round())
    } else if meters < 1000.0 {
        format!("{}m", (meters / 10.0).round() * 10.0)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}

/// Human readable duration: `12 min`, `1h 5min`, `2h`
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let minutes = (seconds / 60.0).round().max(0.0) as u64;
    match minutes {
        m if m < 60 => format!("{m} min"),
        m if m % 60 == 0 => format!("{}h", m / 60),
        m => format!("{}h {}min", m / 60, m % 60),
    }
}
