//! # Selection Rules and Sequencing Policy
//!
//! Turns a vibe and a conditions snapshot into the guidance handed to the
//! recommender: which audio-feature hints apply, whether conditions are in
//! play yet, and the prompt text embedding all of it.
//!
//! ## Sequencing
//!
//! The opening songs of a trip follow the listener's vibe only. From song
//! `mood_window + 1` onward (song #4 with the default window of 3) weather
//! and traffic are blended in:
//!
//! ```text
//! position <  window  -> MoodFirst  (vibe-priority instruction, no conditions hints)
//! position >= window  -> Adaptive   (conditions instruction + conditions hints)
//! ```
//!
//! ## Audio Hints
//!
//! | Vibe / condition | Hint |
//! |------------------|------|
//! | sad, melancholy | valence < 0.45, tempo 60-115 BPM |
//! | energetic, hype | valence > 0.5, energy > 0.7, tempo > 115 BPM |
//! | focus, chill, calm | energy < 0.65, instrumental preferred |
//! | heavy/severe traffic (adaptive) | energy < 0.7, nothing aggressive |
//! | rain/drizzle (adaptive) | cozy, introspective |
//!
//! The recommender may go beyond these; they are guidance, not filters.

use crate::conditions::{ConditionsSnapshot, TrafficLevel, WeatherCondition};
use crate::track::{AudioFeatures, TrackCandidate};
use crate::vibe::Vibe;
use std::fmt::Write as _;

/// Whether conditions are allowed to shape the current pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePhase {
    /// Vibe only, weather and traffic ignored
    MoodFirst,
    /// Vibe plus current conditions
    Adaptive,
}

impl SequencePhase {
    #[must_use]
    pub const fn for_position(sequence_position: usize, mood_window: usize) -> Self {
        match sequence_position < mood_window {
            true => Self::MoodFirst,
            false => Self::Adaptive,
        }
    }
}

/// One piece of guidance for the recommender
#[derive(Debug, Clone, PartialEq)]
pub enum RuleHint {
    /// Opening songs: match the vibe, ignore conditions
    VibePriority { vibe: Vibe, song_number: usize },
    /// Later songs: conditions may now shape the pick
    ConditionsBlend {
        vibe: Vibe,
        weather: WeatherCondition,
        traffic: TrafficLevel,
        song_number: usize,
    },
    /// Sad / melancholy
    LowValence,
    /// Energetic / hype
    HighEnergy,
    /// Focus / chill / calm
    LowEnergyInstrumental,
    /// Heavy or severe traffic
    SteadyInTraffic,
    /// Rain or drizzle
    CozyRain,
}

impl RuleHint {
    /// True for hints that exist because of weather or traffic
    #[must_use]
    pub const fn is_conditions_adjustment(&self) -> bool {
        matches!(self, Self::ConditionsBlend { .. } | Self::SteadyInTraffic | Self::CozyRain)
    }

    /// Instruction line as it appears in the prompt
    #[must_use]
    pub fn instruction(&self) -> String {
        match self {
            Self::VibePriority { vibe, song_number } => format!(
                "TOP PRIORITY (song #{song_number}, opening of the trip): match the listener's chosen vibe ({vibe}) exclusively."
            ),
            Self::ConditionsBlend { vibe, weather, traffic, song_number } => format!(
                "ADAPT (song #{song_number}): keep the {vibe} vibe but adjust for weather ({weather}) and traffic ({traffic})."
            ),
            Self::LowValence => "- SAD mood: valence < 0.45, tempo 60-115 BPM".to_string(),
            Self::HighEnergy => "- ENERGETIC mood: valence > 0.5, energy > 0.7, tempo > 115 BPM".to_string(),
            Self::LowEnergyInstrumental => "- FOCUS/CHILL: energy < 0.65, prefer instrumental".to_string(),
            Self::SteadyInTraffic => "- HEAVY TRAFFIC: avoid aggressive songs, prefer calm (energy < 0.7)".to_string(),
            Self::CozyRain => "- RAIN: favor cozy, introspective tracks".to_string(),
        }
    }

    /// How well `features` satisfies this hint, in `0.0..=1.0`.
    ///
    /// Instruction-only hints return `None`.
    #[must_use]
    pub fn fit(&self, f: &AudioFeatures) -> Option<f64> {
        let score = match self {
            Self::VibePriority { .. } | Self::ConditionsBlend { .. } => return None,
            Self::LowValence => mean(&[below(f.valence, 0.45), within(f.tempo, 60.0, 115.0)]),
            Self::HighEnergy => mean(&[above(f.valence, 0.5), above(f.energy, 0.7), above(f.tempo / 200.0, 115.0 / 200.0)]),
            Self::LowEnergyInstrumental => mean(&[below(f.energy, 0.65), f.instrumentalness.clamp(0.0, 1.0)]),
            Self::SteadyInTraffic => below(f.energy, 0.7),
            Self::CozyRain => mean(&[f.acousticness.clamp(0.0, 1.0), below(f.valence, 0.6), below(f.energy, 0.6)]),
        };
        Some(score)
    }
}

/// 1.0 at or below `limit`, falling off linearly above it
fn below(value: f64, limit: f64) -> f64 {
    match value <= limit {
        true => 1.0,
        false => (1.0 - (value - limit) / (1.0 - limit).max(f64::EPSILON)).max(0.0),
    }
}

/// 1.0 at or above `limit`, falling off linearly below it
fn above(value: f64, limit: f64) -> f64 {
    match value >= limit {
        true => 1.0,
        false => (value / limit.max(f64::EPSILON)).clamp(0.0, 1.0),
    }
}

fn within(value: f64, lo: f64, hi: f64) -> f64 {
    match (lo..=hi).contains(&value) {
        true => 1.0,
        false => 0.0,
    }
}

fn mean(values: &[f64]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = values.len().max(1) as f64;
    values.iter().sum::<f64>() / n
}

/// Hints for picking song `sequence_position` (0-based) of the trip.
///
/// The phase-level instruction always comes first. Conditions hints only
/// appear in the adaptive phase.
#[must_use]
pub fn selection_rules(
    vibe: Vibe,
    conditions: &ConditionsSnapshot,
    sequence_position: usize,
    mood_window: usize,
) -> Vec<RuleHint> {
    let song_number = sequence_position + 1;
    let phase = SequencePhase::for_position(sequence_position, mood_window);
    let mut rules = Vec::new();

    match phase {
        SequencePhase::MoodFirst => rules.push(RuleHint::VibePriority { vibe, song_number }),
        SequencePhase::Adaptive => rules.push(RuleHint::ConditionsBlend {
            vibe,
            weather: conditions.weather_condition,
            traffic: conditions.traffic_level,
            song_number,
        }),
    }

    match vibe {
        Vibe::Sad | Vibe::Melancholy => rules.push(RuleHint::LowValence),
        Vibe::Energetic | Vibe::Hype => rules.push(RuleHint::HighEnergy),
        Vibe::Focus | Vibe::Chill | Vibe::Calm => rules.push(RuleHint::LowEnergyInstrumental),
        Vibe::Happy => {}
    }

    if phase == SequencePhase::Adaptive {
        if conditions.traffic_level.is_congested() {
            rules.push(RuleHint::SteadyInTraffic);
        }
        if matches!(conditions.weather_condition, WeatherCondition::Rain | WeatherCondition::Drizzle) {
            rules.push(RuleHint::CozyRain);
        }
    }

    rules
}

/// Ambient context lines. Empty in the mood-first phase.
#[must_use]
pub fn context_notes(conditions: &ConditionsSnapshot, phase: SequencePhase) -> Vec<&'static str> {
    if phase == SequencePhase::MoodFirst {
        return Vec::new();
    }

    let mut notes = Vec::new();
    match conditions.weather_condition {
        WeatherCondition::Rain | WeatherCondition::Drizzle => notes.push("RAINY: cozy, mellow music preferred"),
        WeatherCondition::Clear if conditions.temperature_c.is_some_and(|t| t > 20.0) => {
            notes.push("SUNNY: upbeat, feel-good music works well");
        }
        _ => {}
    }
    match conditions.traffic_level {
        TrafficLevel::Heavy | TrafficLevel::Severe => notes.push("HEAVY TRAFFIC: calm, steady music for safety"),
        TrafficLevel::Light => notes.push("LIGHT TRAFFIC: more energetic tracks are safe"),
        _ => {}
    }
    notes
}

/// Everything the prompt needs
#[derive(Debug, Clone)]
pub struct PromptInput<'a> {
    pub vibe: Vibe,
    pub conditions: &'a ConditionsSnapshot,
    pub phase: SequencePhase,
    pub trip_minutes: u64,
    pub target_len: usize,
    pub offered: &'a [TrackCandidate],
    pub hints: &'a [RuleHint],
    pub notes: &'a [&'static str],
    pub preferences_text: &'a str,
}

/// System message sent ahead of the prompt
pub const SYSTEM_PROMPT: &str = "You are a professional music curator who ONLY responds with valid JSON. \
You prioritize the listener's mood for the opening songs, then adjust for driving conditions.";

fn feature_or_unknown(value: Option<f64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| format!("{v:.2}"))
}

/// One numbered candidate line
#[must_use]
pub fn describe_track(number: usize, track: &TrackCandidate) -> String {
    let f = track.audio_features.as_ref();
    format!(
        "{number}. \"{}\" by {} (valence: {}, energy: {}, danceability: {}, tempo: {}, acousticness: {}, instrumentalness: {})",
        track.name,
        track.artist,
        feature_or_unknown(f.map(|f| f.valence)),
        feature_or_unknown(f.map(|f| f.energy)),
        feature_or_unknown(f.map(|f| f.danceability)),
        f.map_or_else(|| "unknown".to_string(), |f| format!("{:.0} BPM", f.tempo)),
        feature_or_unknown(f.map(|f| f.acousticness)),
        feature_or_unknown(f.map(|f| f.instrumentalness)),
    )
}

/// Render the full recommendation prompt.
#[must_use]
pub fn render_prompt(input: &PromptInput<'_>) -> String {
    let mut out = String::from("You are an expert music curator for driving experiences.\n\n");

    out.push_str("LEARNED USER PREFERENCES:\n");
    match input.preferences_text.trim() {
        "" => out.push_str("- No explicit feedback yet. Use general good-driving defaults.\n"),
        text => {
            out.push_str(text);
            out.push('\n');
        }
    }

    out.push_str("\nCURRENT DRIVING CONTEXT:\n");
    let _ = writeln!(out, "- Vibe: {}", input.vibe);
    if input.phase == SequencePhase::Adaptive {
        let c = input.conditions;
        let _ = writeln!(
            out,
            "- Weather: {} ({}), {}",
            c.weather_condition,
            c.weather_description,
            c.temperature_label()
        );
        let _ = writeln!(out, "- Traffic: {}", c.traffic_level);
    }
    let _ = writeln!(out, "- Duration: {} minutes", input.trip_minutes);

    for note in input.notes {
        let _ = writeln!(out, "{note}");
    }

    let _ = writeln!(out, "\nUSER'S AVAILABLE SONGS ({} total):", input.offered.len());
    for (i, track) in input.offered.iter().enumerate() {
        out.push_str(&describe_track(i + 1, track));
        out.push('\n');
    }

    let _ = writeln!(out, "\nTASK: Select exactly {} songs that match the context.", input.target_len);
    out.push_str("\nSELECTION RULES:\n");
    for hint in input.hints {
        out.push_str(&hint.instruction());
        out.push('\n');
    }

    let _ = write!(
        out,
        "\nOUTPUT FORMAT (JSON only):\n{{\n  \"selectedTracks\": [song numbers from 1-{}],\n  \"reasoning\": \"One sentence explaining the selection\"\n}}\n\nRespond with ONLY valid JSON.",
        input.offered.len()
    );

    out
}
