//! # Integration Tests for VibeNav
//!
//! Whole trips driven through the public API with a SQLite feedback log in a
//! temporary directory, plus a few runs of the compiled binary.

use anyhow::Result;
use async_trait::async_trait;
use std::process::Command;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use vibenav::conditions::{CongestionLevel, WeatherCondition};
use vibenav::config::EngineConfig;
use vibenav::db::{FeedbackStore, SqliteFeedbackStore};
use vibenav::demo::demo_steps;
use vibenav::error::{RecommendationError, TripError};
use vibenav::feedback::{FeedbackAction, FeedbackContext, FeedbackEvent, PreferenceLearner, TripRating, NO_FEEDBACK_LINE};
use vibenav::geo::Coordinate;
use vibenav::providers::{
    LiveProviders, LocationProvider, RouteInfo, RoutingProvider, StaticCatalog, WeatherProvider, WeatherReport,
};
use vibenav::recommender::{FeatureRecommender, RecommendationBrief, Recommender};
use vibenav::rules::SequencePhase;
use vibenav::session::TripEngine;
use vibenav::track::{load_tracks_json, AudioFeatures, TrackCandidate};
use vibenav::vibe::Vibe;

/// Feature recommender that keeps every brief it was given
#[derive(Default)]
struct RecordingRecommender {
    briefs: Mutex<Vec<RecommendationBrief>>,
}

impl RecordingRecommender {
    fn briefs(&self) -> Vec<RecommendationBrief> {
        self.briefs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recommender for RecordingRecommender {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn recommend(&self, brief: &RecommendationBrief) -> Result<String, RecommendationError> {
        self.briefs.lock().unwrap().push(brief.clone());
        FeatureRecommender.recommend(brief).await
    }
}

struct DownRecommender;

#[async_trait]
impl Recommender for DownRecommender {
    fn name(&self) -> &'static str {
        "down"
    }

    async fn recommend(&self, _: &RecommendationBrief) -> Result<String, RecommendationError> {
        Err(RecommendationError::Upstream("503 Service Unavailable".to_string()))
    }
}

struct Here;

#[async_trait]
impl LocationProvider for Here {
    async fn current_position(&self) -> Result<Coordinate, TripError> {
        Ok(demo_steps()[0].location)
    }
}

struct HalfHourRoute;

#[async_trait]
impl RoutingProvider for HalfHourRoute {
    async fn route(&self, _: Coordinate, _: Coordinate) -> Result<RouteInfo> {
        Ok(RouteInfo {
            distance_meters: 2900.0,
            duration_seconds: 1800.0,
            polyline: "o}bgGdnxbP".to_string(),
            congestion_samples: vec![CongestionLevel::Low; 10],
            steps: demo_steps(),
        })
    }
}

struct Drizzle;

#[async_trait]
impl WeatherProvider for Drizzle {
    async fn current_weather(&self, _: Coordinate) -> Result<WeatherReport> {
        Ok(WeatherReport { temperature_c: 11.0, condition: WeatherCondition::Drizzle, description: "light drizzle".into() })
    }
}

/// Write 15 tracks to a JSON file the way a catalog export would look
fn write_library(dir: &TempDir) -> Result<Vec<TrackCandidate>> {
    let tracks: Vec<TrackCandidate> = (0..15)
        .map(|i| {
            let f = f64::from(i) / 15.0;
            TrackCandidate::new(format!("lib-{i}"), format!("Song {i}"), format!("Artist {}", i % 5)).with_features(
                AudioFeatures {
                    valence: f,
                    energy: 1.0 - f,
                    danceability: 0.5,
                    tempo: 80.0 + f * 80.0,
                    acousticness: f,
                    instrumentalness: 0.0,
                },
            )
        })
        .collect();

    let path = dir.path().join("library.json");
    std::fs::write(&path, serde_json::to_string_pretty(&tracks)?)?;
    load_tracks_json(&path)
}

fn rainy_skip(track: &TrackCandidate) -> FeedbackEvent {
    let ctx = FeedbackContext {
        mood: Vibe::Chill,
        vibe: Vibe::Calm,
        weather_condition: WeatherCondition::Rain,
        traffic_level: vibenav::conditions::TrafficLevel::Moderate,
    };
    FeedbackEvent::track_action(track, FeedbackAction::Skipped, &ctx)
}

#[cfg(test)]
mod trip_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_demo_trip_persists_feedback() -> Result<()> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("feedback.db");
        let engine = TripEngine::new(
            Arc::new(FeatureRecommender),
            Arc::new(SqliteFeedbackStore::open(&db_path)?),
            EngineConfig::default(),
        );

        let trip = engine.start_demo(&StaticCatalog::default(), Vibe::Energetic, "sam").await;
        assert!(trip.next().await.is_some());
        assert!(trip.love().await.is_some());
        assert_eq!(trip.run_demo(|_| {}).await, 15);
        trip.end(Some(TripRating::Great)).await;
        drop((engine, trip));

        let history = SqliteFeedbackStore::open(&db_path)?.history("sam")?;
        let kinds: Vec<_> = history.iter().map(FeedbackEvent::kind).collect();
        assert_eq!(kinds, ["track_action", "track_action", "trip_rating"]);
        match &history[2] {
            FeedbackEvent::TripRating { rating, vibe, mood, .. } => {
                assert_eq!(*rating, TripRating::Great);
                assert_eq!(*vibe, Vibe::Hype);
                assert_eq!(*mood, Some(Vibe::Energetic));
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_requests_follow_the_sequencing_policy() {
        let recorder = Arc::new(RecordingRecommender::default());
        let engine = TripEngine::new(
            recorder.clone(),
            Arc::new(vibenav::db::MemoryFeedbackStore::new()),
            EngineConfig::default(),
        );

        let trip = engine.start_demo(&StaticCatalog::default(), Vibe::Happy, "sam").await;
        trip.run_demo(|_| {}).await;

        let briefs = recorder.briefs();
        assert_eq!(briefs.len(), 16);
        let numbers: Vec<_> = briefs.iter().map(|b| b.song_number).collect();
        assert_eq!(numbers, (1..=16).collect::<Vec<_>>());

        for brief in &briefs[..3] {
            assert_eq!(brief.phase, SequencePhase::MoodFirst);
            assert!(brief.notes.is_empty());
            assert!(!brief.prompt.contains("- Weather:"));
            assert!(!brief.prompt.contains("- Traffic:"));
        }
        for brief in &briefs[3..] {
            assert_eq!(brief.phase, SequencePhase::Adaptive);
            assert!(brief.prompt.contains("- Weather:"));
        }

        // Song 6 is chosen at the Whitney Way turn, the first rainy waypoint
        assert_eq!(briefs[5].conditions.weather_condition, WeatherCondition::Rain);
        assert!(!briefs[5].notes.is_empty());
        assert!(briefs.iter().all(|b| b.vibe == Vibe::Hype), "vibe never changes mid-trip");
    }

    #[tokio::test]
    async fn test_learned_preferences_reach_the_next_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let store = Arc::new(SqliteFeedbackStore::open(&dir.path().join("feedback.db"))?);
        let learner = PreferenceLearner::new(store.clone());
        let track = TrackCandidate::new("9", "Someone You Loved", "Lewis Capaldi");
        for _ in 0..3 {
            learner.try_record("sam", &rainy_skip(&track))?;
        }

        let recorder = Arc::new(RecordingRecommender::default());
        let engine = TripEngine::new(recorder.clone(), store, EngineConfig::default());
        engine.start_demo(&StaticCatalog::default(), Vibe::Chill, "sam").await;
        engine.start_demo(&StaticCatalog::default(), Vibe::Chill, "kim").await;

        let briefs = recorder.briefs();
        assert!(briefs[0].preferences_text.contains("rainy conditions, user often skips"));
        assert!(briefs[0].prompt.contains("rainy conditions, user often skips"));
        assert_eq!(briefs[1].preferences_text, NO_FEEDBACK_LINE);
        Ok(())
    }

    #[tokio::test]
    async fn test_live_trip_with_exported_library() -> Result<()> {
        let dir = TempDir::new()?;
        let library = write_library(&dir)?;
        let catalog = StaticCatalog::new(library.clone());
        let engine = TripEngine::new(
            Arc::new(FeatureRecommender),
            Arc::new(SqliteFeedbackStore::open(&dir.path().join("feedback.db"))?),
            EngineConfig::default(),
        );
        let providers = LiveProviders { location: &Here, routing: &HalfHourRoute, weather: &Drizzle, catalog: &catalog };

        let destination = demo_steps()[6].location;
        let trip = engine.start_live(providers, destination, Vibe::Energetic, "sam").await?;
        let s = trip.snapshot().await;
        assert_eq!(s.vibe, Vibe::Calm);
        // 30 minutes at 3 minutes a song is 10, raised to the minimum of 12
        assert_eq!(s.playlist.len(), 12);
        assert!(s.playlist.iter().all(|t| library.contains(t)));

        for step in demo_steps() {
            trip.on_position(step.location).await?;
        }
        let s = trip.snapshot().await;
        assert_eq!(s.current_step_index, 6, "final step is never passed");
        assert_eq!(s.distance_to_next_maneuver, Some(0.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_recommender_outage_pads_the_playlist() -> Result<()> {
        let dir = TempDir::new()?;
        let catalog = StaticCatalog::new(write_library(&dir)?);
        let engine = TripEngine::new(
            Arc::new(DownRecommender),
            Arc::new(vibenav::db::MemoryFeedbackStore::new()),
            EngineConfig::default(),
        );
        let providers = LiveProviders { location: &Here, routing: &HalfHourRoute, weather: &Drizzle, catalog: &catalog };

        let trip = engine.start_live(providers, demo_steps()[6].location, Vibe::Happy, "sam").await?;
        let s = trip.snapshot().await;
        assert_eq!(s.playlist.len(), 10);
        assert!(s.rationale.starts_with("Fallback selection"));
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn vibenav(args: &[&str]) -> String {
        let output = Command::new(env!("CARGO_BIN_EXE_vibenav"))
            .args(args)
            .output()
            .expect("Failed to run vibenav");
        assert!(output.status.success(), "vibenav {args:?} failed: {}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    #[test]
    fn test_cli_help_lists_commands() {
        let stdout = vibenav(&["--help"]);
        for command in ["demo", "vibe", "feedback", "summary", "traffic", "completion"] {
            assert!(stdout.contains(command), "help is missing {command}");
        }
    }

    #[test]
    fn test_vibe_command() {
        assert!(vibenav(&["vibe", "--mood", "happy", "--weather", "rain"]).starts_with("calm"));
        assert!(vibenav(&["vibe", "--mood", "sad", "--weather", "clear", "--traffic", "light"]).starts_with("hype"));
        assert!(vibenav(&["vibe", "--mood", "sad", "--weather", "clouds"]).starts_with("sad"));
    }

    #[test]
    fn test_traffic_command() {
        assert!(vibenav(&["traffic", "heavy", "heavy", "low"]).starts_with("heavy"));
        assert!(vibenav(&["traffic", "low", "low", "low", "low"]).starts_with("light"));
    }

    #[test]
    fn test_completion_generation() {
        let stdout = vibenav(&["completion", "bash"]);
        assert!(stdout.contains("_vibenav"));
        assert!(stdout.contains("complete"));
    }
}
