//! # Playlist Orchestration
//!
//! Builds a recommendation brief from a [`PlaylistRequest`], hands it to the
//! [`Recommender`], and turns whatever comes back into a [`PlaylistResult`]
//! that can be trusted.
//!
//! ## Request Construction
//!
//! - the pool is truncated to `pool_cap` candidates, order preserved
//! - target length is `clamp(ceil(round(duration / 60) / minutes_per_song), min, max)`
//! - the sequencing phase and hints come from [`crate::rules`]
//!
//! ## Repair
//!
//! ```text
//! reply indices (1-based) -> drop out-of-range and repeats -> truncate to max
//!     -> fewer than pad_floor? pad with shuffled unused pool tracks up to pad_target
//! ```
//!
//! Padding never reports an error. A reply with no usable index list does:
//! [`RecommendationError::MalformedResponse`]. Callers that must not fail use
//! [`PlaylistOrchestrator::request_or_recover`].

use crate::conditions::ConditionsSnapshot;
use crate::error::RecommendationError;
use crate::recommender::{parse_reply, RecommendationBrief, Recommender, RecommenderReply};
use crate::rules::{self, PromptInput, SequencePhase};
use crate::track::{sample_tracks, TrackCandidate};
use crate::vibe::Vibe;
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Playlist sizing and sequencing tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    /// Candidates offered to the recommender
    pub pool_cap: usize,
    /// Lower clamp for the target length
    pub min_length: usize,
    /// Upper clamp for the target length, and hard cap on results
    pub max_length: usize,
    /// Pad when fewer than this many tracks survive validation
    pub pad_floor: usize,
    /// Padding stops once this many tracks are present
    pub pad_target: usize,
    pub minutes_per_song: u64,
    /// Songs picked on vibe alone before conditions apply
    pub mood_window: usize,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            pool_cap: 100,
            min_length: 12,
            max_length: 20,
            pad_floor: 8,
            pad_target: 10,
            minutes_per_song: 3,
            mood_window: 3,
        }
    }
}

impl PlaylistConfig {
    /// Songs to ask for on a trip of `duration_seconds`
    #[must_use]
    pub fn target_length(&self, duration_seconds: u64) -> usize {
        let minutes = (duration_seconds + 30) / 60;
        let songs = usize::try_from(minutes.div_ceil(self.minutes_per_song.max(1))).unwrap_or(usize::MAX);
        songs.clamp(self.min_length, self.max_length)
    }
}

/// One recommendation call
#[derive(Debug, Clone)]
pub struct PlaylistRequest {
    pub vibe: Vibe,
    pub conditions: ConditionsSnapshot,
    pub trip_duration_seconds: u64,
    pub candidate_pool: Vec<TrackCandidate>,
    pub learned_preferences_text: String,
    /// 0-based ordinal of the song being chosen within the trip
    pub sequence_position: usize,
}

/// Validated playlist
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistResult {
    pub ordered_tracks: Vec<TrackCandidate>,
    pub rationale: String,
    /// Tracks added by padding rather than chosen by the recommender
    pub padded: usize,
}

/// Drives one recommender with validation and repair
#[derive(Clone)]
pub struct PlaylistOrchestrator {
    recommender: Arc<dyn Recommender>,
    config: PlaylistConfig,
}

impl std::fmt::Debug for PlaylistOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaylistOrchestrator")
            .field("recommender", &self.recommender.name())
            .field("config", &self.config)
            .finish()
    }
}

impl PlaylistOrchestrator {
    #[must_use]
    pub fn new(recommender: Arc<dyn Recommender>, config: PlaylistConfig) -> Self {
        Self { recommender, config }
    }

    #[must_use]
    pub const fn config(&self) -> &PlaylistConfig {
        &self.config
    }

    /// Assemble everything the recommender will see.
    ///
    /// # Errors
    ///
    /// [`RecommendationError::EmptyPool`] when there is nothing to offer.
    pub fn build_brief(&self, request: &PlaylistRequest) -> Result<RecommendationBrief, RecommendationError> {
        if request.candidate_pool.is_empty() {
            return Err(RecommendationError::EmptyPool);
        }

        let offered: Vec<TrackCandidate> = request
            .candidate_pool
            .iter()
            .take(self.config.pool_cap)
            .cloned()
            .collect();

        let phase = SequencePhase::for_position(request.sequence_position, self.config.mood_window);
        let hints = rules::selection_rules(
            request.vibe,
            &request.conditions,
            request.sequence_position,
            self.config.mood_window,
        );
        let notes = rules::context_notes(&request.conditions, phase);
        let target_len = self.config.target_length(request.trip_duration_seconds);

        let prompt = rules::render_prompt(&PromptInput {
            vibe: request.vibe,
            conditions: &request.conditions,
            phase,
            trip_minutes: (request.trip_duration_seconds + 30) / 60,
            target_len,
            offered: &offered,
            hints: &hints,
            notes: &notes,
            preferences_text: &request.learned_preferences_text,
        });

        Ok(RecommendationBrief {
            vibe: request.vibe,
            conditions: request.conditions.clone(),
            phase,
            song_number: request.sequence_position + 1,
            target_len,
            offered,
            hints,
            notes,
            preferences_text: request.learned_preferences_text.clone(),
            system_prompt: rules::SYSTEM_PROMPT,
            prompt,
        })
    }

    /// Ask the recommender and validate its reply.
    ///
    /// # Errors
    ///
    /// Empty pool, upstream failure, or a reply without a usable index list.
    pub async fn request_playlist(&self, request: &PlaylistRequest) -> Result<PlaylistResult, RecommendationError> {
        let brief = self.build_brief(request)?;

        log::info!(
            "Requesting playlist via {}: song #{} vibe={} weather={} traffic={} ({} candidates, target {})",
            self.recommender.name(),
            brief.song_number,
            brief.vibe,
            brief.conditions.weather_condition,
            brief.conditions.traffic_level,
            brief.offered.len(),
            brief.target_len
        );

        let raw = self.recommender.recommend(&brief).await?;
        let reply = parse_reply(&raw)?;
        Ok(self.repair(&reply, &brief.offered))
    }

    /// Like [`Self::request_playlist`] but never fails.
    pub async fn request_or_recover(&self, request: &PlaylistRequest) -> PlaylistResult {
        match self.request_playlist(request).await {
            Ok(result) => result,
            Err(e) => self.recover(request, &e),
        }
    }

    /// Map a parsed reply onto `offered`, dropping bad indices and padding.
    #[must_use]
    pub fn repair(&self, reply: &RecommenderReply, offered: &[TrackCandidate]) -> PlaylistResult {
        let mut seen = HashSet::new();
        let mut tracks: Vec<TrackCandidate> = reply
            .selected
            .iter()
            .filter_map(|&i| usize::try_from(i).ok())
            .filter_map(|i| i.checked_sub(1).and_then(|i| offered.get(i)))
            .filter(|t| seen.insert(t.id.clone()))
            .cloned()
            .collect();

        let dropped = reply.selected.len() - tracks.len();
        if dropped > 0 {
            log::debug!("Dropped {dropped} out-of-range or repeated indices from reply");
        }
        tracks.truncate(self.config.max_length);

        let padded = self.pad(&mut tracks, offered);
        log_playlist_quality(&tracks);

        PlaylistResult { ordered_tracks: tracks, rationale: reply.rationale.clone(), padded }
    }

    /// Build a playlist without the recommender after it failed.
    ///
    /// Falls back to the sample library when the request pool is empty.
    #[must_use]
    pub fn recover(&self, request: &PlaylistRequest, error: &RecommendationError) -> PlaylistResult {
        log::warn!("Recommendation failed ({error}), padding from the pool instead");

        let capped: Vec<TrackCandidate> = request.candidate_pool.iter().take(self.config.pool_cap).cloned().collect();
        let offered = match capped.is_empty() {
            true => sample_tracks(),
            false => capped,
        };

        let mut tracks = Vec::new();
        let padded = self.pad(&mut tracks, &offered);
        PlaylistResult {
            ordered_tracks: tracks,
            rationale: format!("Fallback selection for a {} vibe", request.vibe),
            padded,
        }
    }

    /// Top up `tracks` from unused pool entries in random order.
    fn pad(&self, tracks: &mut Vec<TrackCandidate>, offered: &[TrackCandidate]) -> usize {
        if tracks.len() >= self.config.pad_floor {
            return 0;
        }

        let mut used: HashSet<String> = tracks.iter().map(|t| t.id.clone()).collect();
        let mut remainder: Vec<&TrackCandidate> = offered.iter().filter(|t| !used.contains(&t.id)).collect();
        remainder.shuffle(&mut thread_rng());

        let before = tracks.len();
        for track in remainder {
            if tracks.len() >= self.config.pad_target {
                break;
            }
            if used.insert(track.id.clone()) {
                tracks.push(track.clone());
            }
        }

        let padded = tracks.len() - before;
        log::info!("Padded playlist with {padded} random tracks ({} total)", tracks.len());
        padded
    }
}

/// Warn when one artist dominates the playlist
fn log_playlist_quality(tracks: &[TrackCandidate]) {
    if tracks.is_empty() {
        return;
    }
    let artists: HashSet<_> = tracks.iter().map(|t| t.artist.as_str()).collect();
    #[allow(clippy::cast_precision_loss)]
    let diversity = artists.len() as f64 / tracks.len() as f64;
    if diversity < 0.5 {
        log::warn!("Playlist artist diversity is low: {diversity:.2}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with the same text every time and remembers what it was shown
    struct ScriptedRecommender {
        reply: Result<String, RecommendationError>,
        seen: Mutex<Vec<RecommendationBrief>>,
    }

    impl ScriptedRecommender {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self { reply: Ok(text.to_string()), seen: Mutex::new(Vec::new()) })
        }

        fn failing(error: RecommendationError) -> Arc<Self> {
            Arc::new(Self { reply: Err(error), seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl Recommender for ScriptedRecommender {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn recommend(&self, brief: &RecommendationBrief) -> Result<String, RecommendationError> {
            self.seen.lock().unwrap().push(brief.clone());
            self.reply.clone()
        }
    }

    fn pool(n: usize) -> Vec<TrackCandidate> {
        (0..n)
            .map(|i| TrackCandidate::new(format!("t{i}"), format!("Song {i}"), format!("Artist {}", i % 7)))
            .collect()
    }

    fn request(pool: Vec<TrackCandidate>, sequence_position: usize) -> PlaylistRequest {
        PlaylistRequest {
            vibe: Vibe::Chill,
            conditions: ConditionsSnapshot::new(
                Some(18.0),
                crate::conditions::WeatherCondition::Rain,
                "light rain",
                crate::conditions::TrafficLevel::Heavy,
            ),
            trip_duration_seconds: 1200,
            candidate_pool: pool,
            learned_preferences_text: String::new(),
            sequence_position,
        }
    }

    fn assert_invariants(result: &PlaylistResult, offered: &[TrackCandidate], config: &PlaylistConfig) {
        let ids: HashSet<_> = result.ordered_tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), result.ordered_tracks.len(), "duplicate ids in {result:?}");
        assert!(result.ordered_tracks.iter().all(|t| offered.contains(t)), "track outside pool");
        assert!(result.ordered_tracks.len() <= config.max_length);
        assert!(result.ordered_tracks.len() >= config.pad_floor.min(offered.len()));
    }

    #[test]
    fn test_target_length() {
        let config = PlaylistConfig::default();
        assert_eq!(config.target_length(1200), 12);
        assert_eq!(config.target_length(2700), 15);
        assert_eq!(config.target_length(3600), 20);
        assert_eq!(config.target_length(7200), 20);
        assert_eq!(config.target_length(0), 12);
    }

    #[tokio::test]
    async fn test_valid_reply_kept_in_order() {
        let orchestrator = PlaylistOrchestrator::new(
            ScriptedRecommender::replying(r#"{"selectedTracks":[9,8,7,6,5,4,3,2,1],"reasoning":"rainy"}"#),
            PlaylistConfig::default(),
        );
        let result = orchestrator.request_playlist(&request(pool(30), 0)).await.unwrap();

        assert_eq!(result.padded, 0);
        assert_eq!(result.rationale, "rainy");
        let ids: Vec<_> = result.ordered_tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t8", "t7", "t6", "t5", "t4", "t3", "t2", "t1", "t0"]);
    }

    #[tokio::test]
    async fn test_out_of_range_indices_dropped_and_padded() {
        let offered = pool(30);
        let orchestrator = PlaylistOrchestrator::new(
            ScriptedRecommender::replying(r#"{"selectedTracks":[1,2,99,0,-1,2],"reasoning":"x"}"#),
            PlaylistConfig::default(),
        );
        let result = orchestrator.request_playlist(&request(offered.clone(), 0)).await.unwrap();

        assert_eq!(result.ordered_tracks.len(), 10);
        assert_eq!(result.padded, 8);
        assert_eq!(result.ordered_tracks[0].id, "t0");
        assert_eq!(result.ordered_tracks[1].id, "t1");
        assert_invariants(&result, &offered, orchestrator.config());
    }

    #[tokio::test]
    async fn test_padding_stops_when_pool_exhausted() {
        let offered = pool(4);
        let orchestrator = PlaylistOrchestrator::new(
            ScriptedRecommender::replying(r#"{"selectedTracks":[2],"reasoning":""}"#),
            PlaylistConfig::default(),
        );
        let result = orchestrator.request_playlist(&request(offered.clone(), 0)).await.unwrap();
        assert_eq!(result.ordered_tracks.len(), 4);
        assert_invariants(&result, &offered, orchestrator.config());
    }

    #[tokio::test]
    async fn test_long_reply_truncated_to_max() {
        let indices: Vec<String> = (1..=40).map(|i| i.to_string()).collect();
        let reply = format!(r#"{{"selectedTracks":[{}]}}"#, indices.join(","));
        let orchestrator = PlaylistOrchestrator::new(ScriptedRecommender::replying(&reply), PlaylistConfig::default());
        let result = orchestrator.request_playlist(&request(pool(50), 0)).await.unwrap();
        assert_eq!(result.ordered_tracks.len(), 20);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_an_error() {
        let orchestrator = PlaylistOrchestrator::new(
            ScriptedRecommender::replying("I picked some great songs for you!"),
            PlaylistConfig::default(),
        );
        let err = orchestrator.request_playlist(&request(pool(30), 0)).await.unwrap_err();
        assert!(matches!(err, RecommendationError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_recover_pads_from_pool_or_samples() {
        let orchestrator = PlaylistOrchestrator::new(
            ScriptedRecommender::failing(RecommendationError::Upstream("timeout".into())),
            PlaylistConfig::default(),
        );

        let offered = pool(30);
        let result = orchestrator.request_or_recover(&request(offered.clone(), 0)).await;
        assert_eq!(result.ordered_tracks.len(), 10);
        assert_invariants(&result, &offered, orchestrator.config());

        let result = orchestrator.request_or_recover(&request(Vec::new(), 0)).await;
        assert_eq!(result.ordered_tracks.len(), 10);
        let samples = sample_tracks();
        assert!(result.ordered_tracks.iter().all(|t| samples.contains(t)));
    }

    #[tokio::test]
    async fn test_pool_capped_in_order() {
        let recommender = ScriptedRecommender::replying(r#"{"selectedTracks":[101,100]}"#);
        let orchestrator = PlaylistOrchestrator::new(recommender.clone(), PlaylistConfig::default());
        let result = orchestrator.request_playlist(&request(pool(150), 0)).await.unwrap();

        let seen = recommender.seen.lock().unwrap();
        assert_eq!(seen[0].offered.len(), 100);
        assert_eq!(seen[0].offered[99].id, "t99");
        // 101 is past the cap, 100 survives
        assert_eq!(result.ordered_tracks[0].id, "t99");
        assert!(result.ordered_tracks.iter().all(|t| seen[0].offered.contains(t)));
    }

    #[tokio::test]
    async fn test_sequencing_switches_at_window() {
        let recommender = ScriptedRecommender::replying(r#"{"selectedTracks":[1,2,3,4,5,6,7,8]}"#);
        let orchestrator = PlaylistOrchestrator::new(recommender.clone(), PlaylistConfig::default());

        for position in 0..6 {
            orchestrator.request_playlist(&request(pool(20), position)).await.unwrap();
        }

        let seen = recommender.seen.lock().unwrap();
        for brief in seen.iter() {
            let mood_first = brief.prompt.contains("TOP PRIORITY");
            let adaptive = brief.prompt.contains("ADAPT (song");
            assert_ne!(mood_first, adaptive, "exactly one phase instruction expected");
            match brief.song_number {
                1..=3 => {
                    assert!(mood_first);
                    assert!(!brief.prompt.contains("HEAVY TRAFFIC"));
                    assert!(!brief.prompt.contains("RAIN"));
                }
                _ => {
                    assert!(adaptive);
                    assert!(brief.prompt.contains("HEAVY TRAFFIC"));
                }
            }
        }
    }

    #[test]
    fn test_invariants_hold_for_noisy_replies() {
        let offered = pool(25);
        let orchestrator = PlaylistOrchestrator::new(
            ScriptedRecommender::replying("{}"),
            PlaylistConfig::default(),
        );

        // Deterministic junk: repeats, negatives, zero, far out of range
        for seed in 0..50_i64 {
            let selected: Vec<i64> = (0..seed % 30).map(|k| (k * 7 + seed * 3) % 40 - 5).collect();
            let reply = RecommenderReply { selected, rationale: String::new() };
            let result = orchestrator.repair(&reply, &offered);
            assert_invariants(&result, &offered, orchestrator.config());
        }
    }
}
