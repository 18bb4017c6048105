//! # VibeNav
//!
//! Trip-aware playlist engine. The binary wraps the library with a clap CLI:
//! it runs the scripted demo trip with the offline feature recommender, and
//! exposes the vibe selector, the feedback log and the traffic classifier
//! for inspection.
//!
//! ## Usage
//!
//! ```bash
//! # Watch the playlist follow a rainy, congested drive
//! RUST_LOG=info vibenav demo --mood happy --tick-ms 1000
//!
//! # What does "energetic" become in a jam?
//! vibenav vibe --mood energetic --traffic heavy
//!
//! # Teach it something, then see what it learned
//! vibenav feedback trip --user sam --rating bad --vibe focus --traffic heavy
//! vibenav summary --user sam
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use vibenav::cli::{self, Command, ContextArgs, FeedbackCommand};
use vibenav::completion;
use vibenav::conditions::analyze_traffic;
use vibenav::config::{get_db_path, EngineConfig};
use vibenav::db::SqliteFeedbackStore;
use vibenav::demo::DEMO_WAYPOINTS;
use vibenav::feedback::{FeedbackContext, FeedbackEvent, PreferenceLearner, TripRating};
use vibenav::geo::format_duration;
use vibenav::providers::StaticCatalog;
use vibenav::recommender::FeatureRecommender;
use vibenav::session::TripEngine;
use vibenav::track::{load_tracks_json, TrackCandidate};
use vibenav::vibe::{explain_vibe, Vibe};

fn open_learner() -> Result<PreferenceLearner> {
    let db_path = get_db_path()?;
    debug!("Using feedback log at {}", db_path.display());
    Ok(PreferenceLearner::new(Arc::new(SqliteFeedbackStore::open(&db_path)?)))
}

const fn feedback_context(args: ContextArgs) -> FeedbackContext {
    FeedbackContext {
        mood: match args.mood {
            Some(mood) => mood,
            None => args.vibe,
        },
        vibe: args.vibe,
        weather_condition: args.weather,
        traffic_level: args.traffic,
    }
}

async fn run_demo(
    mut config: EngineConfig,
    mood: Vibe,
    user: &str,
    tick_ms: Option<u64>,
    tracks: Option<PathBuf>,
    rating: Option<TripRating>,
) -> Result<()> {
    if let Some(tick_ms) = tick_ms {
        config.demo_tick_ms = tick_ms;
        config.validate()?;
    }
    let library = tracks.as_deref().map(load_tracks_json).transpose()?.unwrap_or_default();

    let store = SqliteFeedbackStore::open(&get_db_path()?)?;
    let engine = TripEngine::new(Arc::new(FeatureRecommender), Arc::new(store), config);
    let trip = engine.start_demo(&StaticCatalog::new(library), mood, user).await;

    let start = trip.snapshot().await;
    #[allow(clippy::cast_precision_loss)]
    let duration = format_duration(start.trip_duration_seconds as f64);
    println!(
        "Demo trip for {user}: mood {mood}, vibe {} ({duration}, {} waypoints)",
        start.vibe,
        DEMO_WAYPOINTS.len()
    );
    if !start.rationale.is_empty() {
        println!("  {}", start.rationale);
    }
    println!("[  0] {}", cli::status_line(&start));

    let interrupt = tokio::spawn({
        let trip = trip.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, ending trip");
                trip.end(None).await;
            }
        }
    });

    let mut tick = 0;
    let ticks = trip
        .run_demo(|session| {
            tick += 1;
            println!("[{tick:>3}] {}", cli::status_line(session));
        })
        .await;
    interrupt.abort();

    trip.end(rating).await;
    let end = trip.snapshot().await;
    println!(
        "Trip over after {ticks} ticks: {} conditions updates, {} songs started",
        end.conditions_updates, end.songs_started
    );
    println!("{}", engine.learner().summarize(user));
    Ok(())
}

/// Main entry point for VibeNav.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=info vibenav demo` - Trip events, vibe overrides, playlist requests
/// - `RUST_LOG=vibenav::session=debug vibenav demo` - Stale-response discards
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        Command::Demo { mood, user, tick_ms, tracks, rating } => {
            let config = EngineConfig::load(args.config.as_deref())?;
            run_demo(config, mood, &user, tick_ms, tracks, rating).await?;
        }
        Command::Vibe { mood, weather, traffic } => {
            let selection = explain_vibe(mood, weather, traffic);
            println!("{} ({:?}, ambient mood {})", selection.vibe, selection.reason, weather.ambient_mood());
        }
        Command::Feedback { action } => {
            let learner = open_learner()?;
            let (user, event) = match action {
                FeedbackCommand::Track { user, track_id, track_name, artist, action, context } => {
                    let track = TrackCandidate::new(track_id, track_name, artist);
                    let event = FeedbackEvent::track_action(&track, action, &feedback_context(context));
                    (user, event)
                }
                FeedbackCommand::Trip { user, rating, context } => {
                    (user, FeedbackEvent::trip_rating(rating, &feedback_context(context)))
                }
            };
            learner
                .try_record(&user, &event)
                .with_context(|| format!("Failed to record feedback for {user}"))?;
            println!("Recorded {} for {user}", event.kind());
        }
        Command::Summary { user } => {
            println!("{}", open_learner()?.summarize(&user));
        }
        Command::Traffic { samples } => {
            let analysis = analyze_traffic(&samples);
            println!(
                "{} ({}: {:.0}% heavy, {:.0}% moderate, {:.0}% low)",
                analysis.level, analysis.description, analysis.heavy_pct, analysis.moderate_pct, analysis.low_pct
            );
        }
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
        Command::CompletionEnhanced { shell } => match shell {
            cli::Shell::Fish => completion::generate_enhanced_fish_completion(),
            _ => return Err(anyhow::anyhow!("Enhanced completions are only supported for fish")),
        },
        Command::CompleteMoods => completion::print_mood_completions(),
    }

    Ok(())
}
