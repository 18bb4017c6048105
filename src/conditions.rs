//! # Driving Conditions
//!
//! Weather and traffic state as seen by the engine. Values arrive from the
//! weather provider and the routing provider's congestion annotations (or the
//! demo script) and are bundled into a timestamped [`ConditionsSnapshot`].
//!
//! ## Traffic Derivation
//!
//! Congestion samples along a route are reduced to one [`TrafficLevel`],
//! first match wins:
//!
//! | Rule | Level |
//! |------|-------|
//! | severe > 30% | severe |
//! | heavy + severe > 40% | heavy |
//! | moderate > 30% or heavy + severe > 20% | moderate |
//! | low > 70% | light |
//! | otherwise | smooth |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weather as reported by the provider's main condition group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl WeatherCondition {
    /// Rain, Drizzle, Thunderstorm
    #[must_use]
    pub const fn is_rain_family(self) -> bool {
        matches!(self, Self::Rain | Self::Drizzle | Self::Thunderstorm)
    }

    /// Clear, Clouds
    #[must_use]
    pub const fn is_clearish(self) -> bool {
        matches!(self, Self::Clear | Self::Clouds)
    }

    /// Ambient mood the weather suggests on its own
    #[must_use]
    pub const fn ambient_mood(self) -> &'static str {
        match self {
            Self::Clear => "upbeat",
            Self::Clouds => "calm",
            Self::Rain => "melancholic",
            Self::Drizzle => "cozy",
            Self::Thunderstorm => "intense",
            Self::Snow => "peaceful",
            Self::Mist | Self::Fog => "dreamy",
            Self::Unknown => "neutral",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Clouds => "Clouds",
            Self::Rain => "Rain",
            Self::Drizzle => "Drizzle",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::Mist => "Mist",
            Self::Fog => "Fog",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses case-insensitively. Anything unrecognized becomes `Unknown`.
impl FromStr for WeatherCondition {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" | "cloudy" => Self::Clouds,
            "rain" => Self::Rain,
            "drizzle" => Self::Drizzle,
            "thunderstorm" => Self::Thunderstorm,
            "snow" => Self::Snow,
            "mist" => Self::Mist,
            "fog" => Self::Fog,
            _ => Self::Unknown,
        })
    }
}

/// Route-level traffic classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLevel {
    Light,
    Moderate,
    Heavy,
    Severe,
    Smooth,
    #[serde(other)]
    Unknown,
}

impl TrafficLevel {
    /// Heavy or severe
    #[must_use]
    pub const fn is_congested(self) -> bool {
        matches!(self, Self::Heavy | Self::Severe)
    }

    /// Light or smooth
    #[must_use]
    pub const fn is_free_flowing(self) -> bool {
        matches!(self, Self::Light | Self::Smooth)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Heavy => "heavy",
            Self::Severe => "severe",
            Self::Smooth => "smooth",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TrafficLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "light" => Self::Light,
            "moderate" => Self::Moderate,
            "heavy" => Self::Heavy,
            "severe" => Self::Severe,
            "smooth" => Self::Smooth,
            _ => Self::Unknown,
        })
    }
}

/// One congestion annotation on a route segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Low,
    Moderate,
    Heavy,
    Severe,
    #[serde(other)]
    Unknown,
}

impl FromStr for CongestionLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "moderate" => Self::Moderate,
            "heavy" => Self::Heavy,
            "severe" => Self::Severe,
            _ => Self::Unknown,
        })
    }
}

/// Traffic level plus the percentages it was derived from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficAnalysis {
    pub level: TrafficLevel,
    /// Heavy + severe share, 0-100
    pub heavy_pct: f64,
    pub moderate_pct: f64,
    pub low_pct: f64,
    pub description: &'static str,
}

/// Reduce congestion samples to a traffic level.
///
/// Samples that are not moderate, heavy or severe count toward the low share,
/// including unannotated ones. No samples yields `Unknown`.
#[must_use]
pub fn analyze_traffic(samples: &[CongestionLevel]) -> TrafficAnalysis {
    if samples.is_empty() {
        return TrafficAnalysis {
            level: TrafficLevel::Unknown,
            heavy_pct: 0.0,
            moderate_pct: 0.0,
            low_pct: 0.0,
            description: "Traffic data unavailable",
        };
    }

    let (mut severe, mut heavy, mut moderate, mut low) = (0usize, 0usize, 0usize, 0usize);
    for sample in samples {
        match sample {
            CongestionLevel::Severe => severe += 1,
            CongestionLevel::Heavy => heavy += 1,
            CongestionLevel::Moderate => moderate += 1,
            CongestionLevel::Low | CongestionLevel::Unknown => low += 1,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let total = samples.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let pct = |n: usize| n as f64 / total * 100.0;

    let heavy_pct = pct(heavy + severe);
    let moderate_pct = pct(moderate);
    let low_pct = pct(low);

    // Thresholds compared in integer tenths so boundaries stay exact
    let n = samples.len();
    let over = |count: usize, tenths: usize| count * 10 > n * tenths;

    let (level, description) = if over(severe, 3) {
        (TrafficLevel::Severe, "Severe traffic congestion")
    } else if over(heavy + severe, 4) {
        (TrafficLevel::Heavy, "Heavy traffic expected")
    } else if over(moderate, 3) || over(heavy + severe, 2) {
        (TrafficLevel::Moderate, "Moderate traffic")
    } else if over(low, 7) {
        (TrafficLevel::Light, "Light traffic")
    } else {
        (TrafficLevel::Smooth, "Traffic is smooth")
    };

    log::debug!(
        "Traffic analysis: {level} ({heavy_pct:.0}% heavy, {moderate_pct:.0}% moderate)"
    );

    TrafficAnalysis { level, heavy_pct, moderate_pct, low_pct, description }
}

/// Weather + traffic at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionsSnapshot {
    /// `None` when the weather provider could not be reached
    pub temperature_c: Option<f64>,
    pub weather_condition: WeatherCondition,
    pub weather_description: String,
    pub traffic_level: TrafficLevel,
    pub captured_at: DateTime<Utc>,
}

impl ConditionsSnapshot {
    #[must_use]
    pub fn new(
        temperature_c: Option<f64>,
        weather_condition: WeatherCondition,
        weather_description: impl Into<String>,
        traffic_level: TrafficLevel,
    ) -> Self {
        Self {
            temperature_c,
            weather_condition,
            weather_description: weather_description.into(),
            traffic_level,
            captured_at: Utc::now(),
        }
    }

    /// Placeholder used when conditions could not be fetched
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(None, WeatherCondition::Unknown, "unavailable", TrafficLevel::Unknown)
    }

    /// Same snapshot with a different traffic level
    #[must_use]
    pub fn with_traffic(mut self, traffic_level: TrafficLevel) -> Self {
        self.traffic_level = traffic_level;
        self
    }

    /// `22°C` or `?°C`
    #[must_use]
    pub fn temperature_label(&self) -> String {
        match self.temperature_c {
            Some(t) => format!("{t:.0}°C"),
            None => "?°C".to_string(),
        }
    }
}
