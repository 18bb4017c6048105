//! # Recommender Seam
//!
//! The recommendation model is a black box behind [`Recommender`]. It gets a
//! [`RecommendationBrief`] (structured guidance plus the rendered prompt) and
//! answers with raw text that is expected to hold
//! `{"selectedTracks": [1-based indices], "reasoning": "..."}`.
//!
//! Replies are never trusted. [`parse_reply`] only checks that a well-formed
//! index list exists; range checks and repair happen in the playlist
//! orchestrator.
//!
//! [`FeatureRecommender`] is an offline implementation that ranks the offered
//! pool against the brief's audio-feature hints. It is deterministic and is
//! what the CLI uses when no network recommender is wired in.

use crate::conditions::ConditionsSnapshot;
use crate::error::RecommendationError;
use crate::rules::{RuleHint, SequencePhase};
use crate::track::TrackCandidate;
use crate::vibe::Vibe;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Everything a recommender is told for one request
#[derive(Debug, Clone)]
pub struct RecommendationBrief {
    pub vibe: Vibe,
    pub conditions: ConditionsSnapshot,
    pub phase: SequencePhase,
    /// 1-based ordinal of the song being chosen
    pub song_number: usize,
    pub target_len: usize,
    /// Candidates as offered, already capped. Reply indices point into this.
    pub offered: Vec<TrackCandidate>,
    pub hints: Vec<RuleHint>,
    pub notes: Vec<&'static str>,
    pub preferences_text: String,
    pub system_prompt: &'static str,
    pub prompt: String,
}

/// External recommendation collaborator
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Produce a raw reply for `brief`.
    ///
    /// # Errors
    ///
    /// [`RecommendationError::Upstream`] when the model can't be reached.
    async fn recommend(&self, brief: &RecommendationBrief) -> Result<String, RecommendationError>;
}

/// Parsed but unvalidated reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommenderReply {
    /// 1-based, possibly out of range or repeated
    pub selected: Vec<i64>,
    pub rationale: String,
}

/// Drop a surrounding ```` ```json ```` fence if present
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// `3`, `3.0` and `"3"` all name track 3
fn reply_index(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            (f.fract() == 0.0 && f.abs() <= i64::MAX as f64).then(|| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a raw reply.
///
/// # Errors
///
/// [`RecommendationError::MalformedResponse`] when the text is not a JSON
/// object or has no `selectedTracks` array. Entries that are not whole
/// numbers (or strings holding one) are dropped.
pub fn parse_reply(raw: &str) -> Result<RecommenderReply, RecommendationError> {
    let body = strip_fences(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RecommendationError::MalformedResponse(format!("reply is not JSON: {e}")))?;

    let list = value
        .get("selectedTracks")
        .and_then(Value::as_array)
        .ok_or_else(|| RecommendationError::MalformedResponse("missing selectedTracks array".to_string()))?;

    let selected = list
        .iter()
        .filter_map(|v| {
            let index = reply_index(v);
            if index.is_none() {
                log::debug!("Dropping non-index entry {v}");
            }
            index
        })
        .collect();

    let rationale = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(RecommenderReply { selected, rationale })
}

/// Fit of one track against the brief's hints, `0.0..=1.0`.
///
/// Tracks without audio features, and briefs without measurable hints,
/// score a neutral 0.5.
#[must_use]
pub fn score_track(track: &TrackCandidate, hints: &[RuleHint]) -> f64 {
    let Some(features) = track.audio_features.as_ref() else {
        return 0.5;
    };
    let fits: Vec<f64> = hints.iter().filter_map(|h| h.fit(features)).collect();
    if fits.is_empty() {
        return 0.5;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = fits.len() as f64;
    fits.iter().sum::<f64>() / n
}

/// Offline recommender ranking candidates by hint fit.
///
/// Ties keep pool order, so the same brief always yields the same reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureRecommender;

impl FeatureRecommender {
    /// Pool positions (0-based) best first
    #[must_use]
    pub fn rank(offered: &[TrackCandidate], hints: &[RuleHint]) -> Vec<usize> {
        let mut scored: Vec<(usize, f64)> = offered
            .iter()
            .enumerate()
            .map(|(i, t)| (i, score_track(t, hints)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().map(|(i, _)| i).collect()
    }
}

#[async_trait]
impl Recommender for FeatureRecommender {
    fn name(&self) -> &'static str {
        "feature"
    }

    async fn recommend(&self, brief: &RecommendationBrief) -> Result<String, RecommendationError> {
        if brief.offered.is_empty() {
            return Err(RecommendationError::EmptyPool);
        }

        let selected: Vec<usize> = Self::rank(&brief.offered, &brief.hints)
            .into_iter()
            .take(brief.target_len)
            .map(|i| i + 1)
            .collect();

        let reasoning = match brief.phase {
            SequencePhase::MoodFirst => format!("Picked the closest matches to a {} vibe.", brief.vibe),
            SequencePhase::Adaptive => format!(
                "Kept the {} vibe while easing into {} weather and {} traffic.",
                brief.vibe, brief.conditions.weather_condition, brief.conditions.traffic_level
            ),
        };

        Ok(json!({ "selectedTracks": selected, "reasoning": reasoning }).to_string())
    }
}
