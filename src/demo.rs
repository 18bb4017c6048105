//! # Demo Trip Script
//!
//! A scripted drive from West Towne Mall to Union South in Madison, WI: 16
//! waypoints with their own weather and traffic, plus the 7 maneuver steps
//! shown along the way. The drive clears up, hits rain and a jam in the
//! middle, then clears again near the destination.
//!
//! [`DemoSimulator`] walks the script once. Frame 0 is the trip start; every
//! later frame is one timer tick. Steps advance on even ticks only, and the
//! simulator ends after the last waypoint without wrapping.

use crate::conditions::{ConditionsSnapshot, TrafficLevel, WeatherCondition};
use crate::geo::{Coordinate, ManeuverStep};

/// One scripted stop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub label: &'static str,
    pub position: Coordinate,
    pub traffic: TrafficLevel,
    pub weather: WeatherCondition,
    pub description: &'static str,
    pub temperature_c: f64,
}

impl Waypoint {
    /// Conditions as of this waypoint
    #[must_use]
    pub fn conditions(&self) -> ConditionsSnapshot {
        ConditionsSnapshot::new(Some(self.temperature_c), self.weather, self.description, self.traffic)
    }
}

const fn wp(
    label: &'static str,
    lat: f64,
    lng: f64,
    traffic: TrafficLevel,
    weather: WeatherCondition,
    description: &'static str,
    temperature_c: f64,
) -> Waypoint {
    Waypoint { label, position: Coordinate::new(lat, lng), traffic, weather, description, temperature_c }
}

use TrafficLevel::{Heavy, Light, Moderate, Severe, Smooth};
use WeatherCondition::{Clear, Clouds, Rain};

/// Demo trip length in seconds, used for playlist sizing
pub const DEMO_TRIP_SECONDS: u64 = 1200;

pub const DEMO_WAYPOINTS: [Waypoint; 16] = [
    wp("West Towne Mall", 43.0592, -89.5040, Light, Clear, "sunny", 23.0),
    wp("Gammon & Mineral Point", 43.0608, -89.4976, Light, Clear, "sunny", 23.0),
    wp("Mineral Point Rd by Target", 43.0614, -89.4929, Moderate, Clouds, "partly cloudy", 22.0),
    wp("Mineral Point Rd by Hy-Vee", 43.0620, -89.4871, Moderate, Clouds, "partly cloudy", 22.0),
    wp("Approaching Whitney Way", 43.0627, -89.4813, Heavy, Clouds, "cloudy", 21.0),
    wp("Whitney Way turn", 43.0652, -89.4748, Heavy, Rain, "light rain", 20.0),
    wp("Mid Whitney Way", 43.0667, -89.4695, Heavy, Rain, "light rain", 19.0),
    wp("Whitney Way & Odana", 43.0679, -89.4643, Severe, Rain, "moderate rain", 18.0),
    wp("Odana Rd eastbound", 43.0685, -89.4599, Severe, Rain, "heavy rain", 18.0),
    wp("Junction Rd / Tokay Blvd", 43.0689, -89.4520, Moderate, Rain, "heavy rain", 19.0),
    wp("Westmorland", 43.0687, -89.4435, Moderate, Rain, "heavy rain", 20.0),
    wp("Mid Regent St", 43.0700, -89.4350, Moderate, Clouds, "clouds clearing", 20.0),
    wp("Regent St by Camp Randall", 43.0707, -89.4241, Heavy, Clouds, "overcast", 20.0),
    wp("Breese Terrace", 43.0709, -89.4190, Moderate, Clouds, "cloudy", 21.0),
    wp("Regent / Monroe split", 43.0711, -89.4147, Light, Clouds, "clouds breaking", 22.0),
    wp("Union South", 43.0715, -89.4075, Smooth, Clear, "sunny", 23.0),
];

fn step(distance_meters: f64, text: &str, kind: &str, modifier: &str, lat: f64, lng: f64) -> ManeuverStep {
    ManeuverStep {
        distance_meters,
        // Scripted at roughly 36 km/h
        duration_seconds: distance_meters / 10.0,
        instruction_text: text.to_string(),
        maneuver_type: kind.to_string(),
        maneuver_modifier: Some(modifier.to_string()),
        location: Coordinate::new(lat, lng),
    }
}

/// Maneuvers displayed during the demo
#[must_use]
pub fn demo_steps() -> Vec<ManeuverStep> {
    vec![
        step(500.0, "Head west on Mineral Point Rd", "depart", "straight", 43.0592, -89.5040),
        step(800.0, "Continue on Mineral Point Rd", "continue", "straight", 43.0605, -89.4932),
        step(300.0, "Turn right onto Whitney Way", "turn", "right", 43.0624, -89.4811),
        step(600.0, "Turn left onto University Ave", "turn", "left", 43.0660, -89.4687),
        step(400.0, "Continue onto Regent St", "new name", "straight", 43.0692, -89.4588),
        step(200.0, "Turn slight right to stay on Regent St", "turn", "slight right", 43.0708, -89.4237),
        step(100.0, "Arrive at Union South", "arrive", "straight", 43.0715, -89.4075),
    ]
}

/// One update produced by the simulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoFrame {
    /// Waypoint index, 0 for the trip start
    pub index: usize,
    pub waypoint: &'static Waypoint,
    /// Move to the next maneuver on this frame
    pub advance_step: bool,
}

/// Single pass over a waypoint script
#[derive(Debug, Clone)]
pub struct DemoSimulator {
    script: &'static [Waypoint],
    cursor: usize,
}

impl Default for DemoSimulator {
    fn default() -> Self {
        Self::new(&DEMO_WAYPOINTS)
    }
}

impl DemoSimulator {
    #[must_use]
    pub const fn new(script: &'static [Waypoint]) -> Self {
        Self { script, cursor: 0 }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.script.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    /// True once every waypoint has been emitted
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.cursor >= self.script.len()
    }
}

impl Iterator for DemoSimulator {
    type Item = DemoFrame;

    fn next(&mut self) -> Option<DemoFrame> {
        let waypoint = self.script.get(self.cursor)?;
        let index = self.cursor;
        self.cursor += 1;
        Some(DemoFrame { index, waypoint, advance_step: index > 0 && index % 2 == 0 })
    }
}
