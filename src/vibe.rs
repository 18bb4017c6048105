//! # Vibe Selection
//!
//! Maps the listener's declared mood and the current conditions to the vibe
//! actually used for recommendation. Safety overrides win over stated
//! preference; with no override in play the declared mood is kept as-is.
//!
//! ```text
//! Rain | Drizzle                  -> calm
//! heavy | severe traffic          -> focus
//! light | smooth traffic + Clear  -> hype
//! otherwise                       -> declared mood
//! ```
//!
//! Selection runs once per conditions snapshot, not once per song.

use crate::conditions::{ConditionsSnapshot, TrafficLevel, WeatherCondition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Listening mood, declared or effective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vibe {
    Energetic,
    Chill,
    Happy,
    Focus,
    Sad,
    Melancholy,
    Hype,
    Calm,
}

/// What the listener asked for
pub type Mood = Vibe;

impl Vibe {
    pub const ALL: [Vibe; 8] = [
        Vibe::Energetic,
        Vibe::Chill,
        Vibe::Happy,
        Vibe::Focus,
        Vibe::Sad,
        Vibe::Melancholy,
        Vibe::Hype,
        Vibe::Calm,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Energetic => "energetic",
            Self::Chill => "chill",
            Self::Happy => "happy",
            Self::Focus => "focus",
            Self::Sad => "sad",
            Self::Melancholy => "melancholy",
            Self::Hype => "hype",
            Self::Calm => "calm",
        }
    }

    /// Hype or energetic
    #[must_use]
    pub const fn is_high_energy(self) -> bool {
        matches!(self, Self::Hype | Self::Energetic)
    }
}

impl fmt::Display for Vibe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vibe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| format!("Unknown mood: {s}. Expected one of: energetic, chill, happy, focus, sad, melancholy, hype, calm"))
    }
}

/// Why a vibe was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibeReason {
    /// Rain or drizzle forced `calm`
    Rain,
    /// Heavy or severe traffic forced `focus`
    Congestion,
    /// Clear sky and free-flowing traffic lifted to `hype`
    OpenRoad,
    /// No override applied
    Declared,
}

/// Vibe plus the rule that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VibeSelection {
    pub vibe: Vibe,
    pub reason: VibeReason,
}

/// Pick the effective vibe and report which rule fired.
#[must_use]
pub const fn explain_vibe(declared: Mood, weather: WeatherCondition, traffic: TrafficLevel) -> VibeSelection {
    match (weather, traffic) {
        (WeatherCondition::Rain | WeatherCondition::Drizzle, _) => {
            VibeSelection { vibe: Vibe::Calm, reason: VibeReason::Rain }
        }
        (_, traffic) if traffic.is_congested() => {
            VibeSelection { vibe: Vibe::Focus, reason: VibeReason::Congestion }
        }
        (WeatherCondition::Clear, traffic) if traffic.is_free_flowing() => {
            VibeSelection { vibe: Vibe::Hype, reason: VibeReason::OpenRoad }
        }
        _ => VibeSelection { vibe: declared, reason: VibeReason::Declared },
    }
}

/// Effective vibe for `declared` under `conditions`. Total and deterministic.
#[must_use]
pub fn select_vibe(declared: Mood, conditions: &ConditionsSnapshot) -> Vibe {
    let selection = explain_vibe(declared, conditions.weather_condition, conditions.traffic_level);
    if selection.reason != VibeReason::Declared {
        log::info!(
            "Vibe override {:?}: {} -> {} (weather={}, traffic={})",
            selection.reason,
            declared,
            selection.vibe,
            conditions.weather_condition,
            conditions.traffic_level
        );
    }
    selection.vibe
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEATHER: [WeatherCondition; 9] = [
        WeatherCondition::Clear,
        WeatherCondition::Clouds,
        WeatherCondition::Rain,
        WeatherCondition::Drizzle,
        WeatherCondition::Thunderstorm,
        WeatherCondition::Snow,
        WeatherCondition::Mist,
        WeatherCondition::Fog,
        WeatherCondition::Unknown,
    ];

    const TRAFFIC: [TrafficLevel; 6] = [
        TrafficLevel::Light,
        TrafficLevel::Moderate,
        TrafficLevel::Heavy,
        TrafficLevel::Severe,
        TrafficLevel::Smooth,
        TrafficLevel::Unknown,
    ];

    fn snapshot(weather: WeatherCondition, traffic: TrafficLevel) -> ConditionsSnapshot {
        ConditionsSnapshot::new(Some(20.0), weather, "test", traffic)
    }

    #[test]
    fn test_rain_beats_light_traffic_and_mood() {
        let vibe = select_vibe(Vibe::Hype, &snapshot(WeatherCondition::Rain, TrafficLevel::Light));
        assert_eq!(vibe, Vibe::Calm);
    }

    #[test]
    fn test_congestion_forces_focus() {
        let vibe = select_vibe(Vibe::Happy, &snapshot(WeatherCondition::Clear, TrafficLevel::Severe));
        assert_eq!(vibe, Vibe::Focus);
    }

    #[test]
    fn test_open_road_lifts_to_hype() {
        let vibe = select_vibe(Vibe::Sad, &snapshot(WeatherCondition::Clear, TrafficLevel::Smooth));
        assert_eq!(vibe, Vibe::Hype);
    }

    #[test]
    fn test_declared_mood_kept_without_override() {
        let vibe = select_vibe(Vibe::Chill, &snapshot(WeatherCondition::Clouds, TrafficLevel::Moderate));
        assert_eq!(vibe, Vibe::Chill);
        // Thunderstorm is not part of the rain override
        let vibe = select_vibe(Vibe::Sad, &snapshot(WeatherCondition::Thunderstorm, TrafficLevel::Light));
        assert_eq!(vibe, Vibe::Sad);
    }

    #[test]
    fn test_total_and_deterministic_over_every_input() {
        for mood in Vibe::ALL {
            for weather in WEATHER {
                for traffic in TRAFFIC {
                    let first = explain_vibe(mood, weather, traffic);
                    let second = explain_vibe(mood, weather, traffic);
                    assert_eq!(first, second);
                    assert!(
                        first.vibe == mood || matches!(first.vibe, Vibe::Calm | Vibe::Focus | Vibe::Hype),
                        "unexpected vibe {:?} for {mood:?}/{weather:?}/{traffic:?}",
                        first.vibe
                    );
                }
            }
        }
    }

    #[test]
    fn test_mood_parsing() {
        assert_eq!("Energetic".parse::<Vibe>().unwrap(), Vibe::Energetic);
        assert!("grumpy".parse::<Vibe>().is_err());
    }
}
