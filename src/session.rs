//! # Trip Sessions
//!
//! [`TripSession`] owns every piece of mutable state for one trip. A
//! [`TripHandle`] is the only way to touch it: position updates, demo ticks,
//! player controls and playlist refreshes all go through the handle, which
//! serializes them on a per-trip async mutex.
//!
//! ## Refresh Protocol
//!
//! ```text
//! lock   -> seq = ++latest_seq, snapshot request   -> unlock
//! await recommender (other events may run here)
//! lock   -> apply only if seq == latest_seq and trip not ended -> unlock
//! ```
//!
//! A superseded or post-end response is dropped without error.
//!
//! ## Cancellation
//!
//! [`TripHandle::end`] marks the session ended and cancels the trip's
//! [`CancellationToken`]. The demo loop and the position feed both select on
//! it, so nothing keeps running once the trip is over.

use crate::conditions::{analyze_traffic, ConditionsSnapshot};
use crate::config::EngineConfig;
use crate::db::FeedbackStore;
use crate::demo::{demo_steps, DemoFrame, DemoSimulator};
use crate::error::{RecommendationError, TripError, TripResult};
use crate::feedback::{FeedbackAction, FeedbackContext, FeedbackEvent, PreferenceLearner, TripRating};
use crate::geo::{Coordinate, GeoProgressTracker, ManeuverStep, StepProgress};
use crate::playlist::{PlaylistOrchestrator, PlaylistRequest, PlaylistResult};
use crate::providers::{CatalogProvider, LiveProviders};
use crate::recommender::Recommender;
use crate::track::{resolve_pool, TrackCandidate};
use crate::vibe::{select_vibe, Mood, Vibe};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Where progress comes from. Fixed for the life of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripMode {
    /// Real position feed
    Live,
    /// Scripted waypoints on a timer
    Demo,
}

/// All mutable state of one trip
#[derive(Debug, Clone)]
pub struct TripSession {
    pub mode: TripMode,
    pub user: String,
    pub declared_mood: Mood,
    pub steps: Vec<ManeuverStep>,
    pub current_step_index: usize,
    pub position: Option<Coordinate>,
    pub distance_to_next_maneuver: Option<f64>,
    pub conditions: ConditionsSnapshot,
    /// Number of times `conditions` has been set, including at start
    pub conditions_updates: usize,
    pub vibe: Vibe,
    pub playlist: Vec<TrackCandidate>,
    pub rationale: String,
    pub current_track_index: usize,
    /// Songs begun so far; the next request picks song `songs_started`
    pub songs_started: usize,
    pub trip_duration_seconds: u64,
    latest_seq: u64,
    ended: bool,
    demo: Option<DemoSimulator>,
}

impl TripSession {
    fn new(
        mode: TripMode,
        user: &str,
        declared_mood: Mood,
        steps: Vec<ManeuverStep>,
        conditions: ConditionsSnapshot,
        trip_duration_seconds: u64,
    ) -> Self {
        let vibe = select_vibe(declared_mood, &conditions);
        Self {
            mode,
            user: user.to_string(),
            declared_mood,
            steps,
            current_step_index: 0,
            position: None,
            distance_to_next_maneuver: None,
            conditions,
            conditions_updates: 1,
            vibe,
            playlist: Vec::new(),
            rationale: String::new(),
            current_track_index: 0,
            songs_started: 0,
            trip_duration_seconds,
            latest_seq: 0,
            ended: false,
            demo: None,
        }
    }

    #[must_use]
    pub fn current_step(&self) -> Option<&ManeuverStep> {
        self.steps.get(self.current_step_index)
    }

    #[must_use]
    pub fn current_track(&self) -> Option<&TrackCandidate> {
        self.playlist.get(self.current_track_index)
    }

    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// Sequence number of the most recent playlist request
    #[must_use]
    pub const fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    fn set_conditions(&mut self, conditions: ConditionsSnapshot) {
        self.conditions = conditions;
        self.conditions_updates += 1;
    }

    fn apply_playlist(&mut self, result: PlaylistResult) {
        self.playlist = result.ordered_tracks;
        self.rationale = result.rationale;
        self.current_track_index = 0;
        if !self.playlist.is_empty() {
            self.songs_started += 1;
        }
    }

    fn feedback_context(&self) -> FeedbackContext {
        FeedbackContext {
            mood: self.declared_mood,
            vibe: self.vibe,
            weather_condition: self.conditions.weather_condition,
            traffic_level: self.conditions.traffic_level,
        }
    }
}

/// Shared, immutable wiring used to start trips
#[derive(Debug, Clone)]
pub struct TripEngine {
    orchestrator: PlaylistOrchestrator,
    learner: PreferenceLearner,
    config: EngineConfig,
}

impl TripEngine {
    #[must_use]
    pub fn new(recommender: Arc<dyn Recommender>, store: Arc<dyn FeedbackStore>, config: EngineConfig) -> Self {
        Self {
            orchestrator: PlaylistOrchestrator::new(recommender, config.playlist.clone()),
            learner: PreferenceLearner::new(store),
            config,
        }
    }

    #[must_use]
    pub const fn learner(&self) -> &PreferenceLearner {
        &self.learner
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn handle(&self, session: TripSession, pool: Vec<TrackCandidate>) -> TripHandle {
        TripHandle {
            user: session.user.clone(),
            state: Arc::new(Mutex::new(session)),
            orchestrator: self.orchestrator.clone(),
            learner: self.learner.clone(),
            pool: Arc::new(pool),
            tracker: self.config.tracker(),
            demo_tick: self.config.demo_tick(),
            cancel: CancellationToken::new(),
        }
    }

    /// Start a trip from the device's position to `destination`.
    ///
    /// # Errors
    ///
    /// [`TripError::GeolocationUnavailable`] or [`TripError::RouteUnavailable`].
    /// Weather and catalog failures degrade instead of failing.
    pub async fn start_live(
        &self,
        providers: LiveProviders<'_>,
        destination: Coordinate,
        declared_mood: Mood,
        user: &str,
    ) -> TripResult<TripHandle> {
        let origin = providers.location.current_position().await?;
        origin
            .validate()
            .map_err(|e| TripError::GeolocationUnavailable(e.to_string()))?;

        let route = providers
            .routing
            .route(origin, destination)
            .await
            .map_err(|e| TripError::RouteUnavailable(format!("{e:#}")))?;
        if route.steps.is_empty() {
            return Err(TripError::RouteUnavailable("route has no maneuver steps".to_string()));
        }
        info!("Navigation ready with {} steps", route.steps.len());

        let traffic = analyze_traffic(&route.congestion_samples);
        let conditions = match providers.weather.current_weather(destination).await {
            Ok(w) => ConditionsSnapshot::new(Some(w.temperature_c), w.condition, w.description, traffic.level),
            Err(e) => {
                warn!("{}, continuing with unknown weather", TripError::ConditionsUnavailable(format!("{e:#}")));
                ConditionsSnapshot::unknown().with_traffic(traffic.level)
            }
        };

        let library = providers
            .catalog
            .tracks()
            .await
            .map_err(|e| warn!("Catalog unavailable: {e:#}"))
            .ok();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let duration = route.duration_seconds.round().max(0.0) as u64;

        let mut session = TripSession::new(TripMode::Live, user, declared_mood, route.steps, conditions, duration);
        session.position = Some(origin);
        info!("Live trip started: mood={declared_mood} vibe={}", session.vibe);

        let handle = self.handle(session, resolve_pool(library));
        handle.refresh().await;
        Ok(handle)
    }

    /// Start the scripted demo trip. Call [`TripHandle::run_demo`] to drive it.
    pub async fn start_demo(&self, catalog: &dyn CatalogProvider, declared_mood: Mood, user: &str) -> TripHandle {
        let library = catalog.tracks().await.map_err(|e| warn!("Catalog unavailable: {e:#}")).ok();

        let mut simulator = DemoSimulator::default();
        let start = simulator.next();
        let conditions = start.map_or_else(ConditionsSnapshot::unknown, |f| f.waypoint.conditions());

        let mut session = TripSession::new(
            TripMode::Demo,
            user,
            declared_mood,
            demo_steps(),
            conditions,
            self.config.demo_trip_seconds,
        );
        session.position = start.map(|f| f.waypoint.position);
        session.demo = Some(simulator);
        info!("Demo trip started: mood={declared_mood} vibe={}", session.vibe);

        let handle = self.handle(session, resolve_pool(library));
        handle.refresh().await;
        handle
    }
}

/// Cloneable handle to one running trip
#[derive(Debug, Clone)]
pub struct TripHandle {
    user: String,
    state: Arc<Mutex<TripSession>>,
    orchestrator: PlaylistOrchestrator,
    learner: PreferenceLearner,
    pool: Arc<Vec<TrackCandidate>>,
    tracker: GeoProgressTracker,
    demo_tick: std::time::Duration,
    cancel: CancellationToken,
}

impl TripHandle {
    /// Copy of the current state
    pub async fn snapshot(&self) -> TripSession {
        self.state.lock().await.clone()
    }

    /// Token cancelled when the trip ends
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request a new playlist, recovering from recommender failures.
    ///
    /// Returns whether the result was applied.
    pub async fn refresh(&self) -> bool {
        self.refresh_playlist(true).await.unwrap_or(false)
    }

    async fn refresh_playlist(&self, recover: bool) -> Result<bool, RecommendationError> {
        let preferences = self.learner.summarize_blocking(&self.user).await.to_text();

        let (seq, request) = {
            let mut s = self.state.lock().await;
            if s.ended {
                return Ok(false);
            }
            s.latest_seq += 1;
            let request = PlaylistRequest {
                vibe: s.vibe,
                conditions: s.conditions.clone(),
                trip_duration_seconds: s.trip_duration_seconds,
                candidate_pool: self.pool.as_ref().clone(),
                learned_preferences_text: preferences,
                sequence_position: s.songs_started,
            };
            (s.latest_seq, request)
        };

        let result = match self.orchestrator.request_playlist(&request).await {
            Ok(result) => result,
            Err(e) if recover => self.orchestrator.recover(&request, &e),
            Err(e) => return Err(e),
        };

        let mut s = self.state.lock().await;
        if s.ended {
            debug!("Trip ended while playlist #{seq} was in flight, dropping it");
            return Ok(false);
        }
        if seq != s.latest_seq {
            debug!("Discarding stale playlist #{seq} (latest is #{})", s.latest_seq);
            return Ok(false);
        }
        info!("Applied playlist #{seq}: {} tracks ({} padded)", result.ordered_tracks.len(), result.padded);
        s.apply_playlist(result);
        Ok(true)
    }

    /// Feed one live position fix.
    ///
    /// # Errors
    ///
    /// [`TripError::Geo`] for a malformed fix. The step index is left alone.
    pub async fn on_position(&self, position: Coordinate) -> TripResult<StepProgress> {
        let mut s = self.state.lock().await;
        let unchanged = StepProgress { distance_to_next_maneuver: s.distance_to_next_maneuver, next_index: s.current_step_index };
        if s.ended {
            return Ok(unchanged);
        }
        if s.mode != TripMode::Live {
            warn!("Ignoring position update on a {:?} trip", s.mode);
            return Ok(unchanged);
        }

        let progress = self.tracker.advance(&position, &s.steps, s.current_step_index)?;
        s.position = Some(position);
        s.distance_to_next_maneuver = progress.distance_to_next_maneuver;
        s.current_step_index = progress.next_index;
        Ok(progress)
    }

    /// Consume position fixes until the channel closes or the trip ends.
    pub async fn follow_positions(&self, mut positions: mpsc::Receiver<Coordinate>) {
        loop {
            let position = tokio::select! {
                () = self.cancel.cancelled() => break,
                next = positions.recv() => match next {
                    Some(position) => position,
                    None => break,
                },
            };
            if let Err(e) = self.on_position(position).await {
                warn!("Dropped position update: {e}");
            }
        }
        debug!("Position feed stopped");
    }

    /// Drive the demo script to completion or until the trip ends.
    ///
    /// `on_update` sees the session after every tick. Returns the number of
    /// ticks processed.
    pub async fn run_demo<F>(&self, mut on_update: F) -> usize
    where
        F: FnMut(&TripSession) + Send,
    {
        let mut ticker = interval_at(Instant::now() + self.demo_tick, self.demo_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("Demo cancelled after {ticks} ticks");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let Some(frame) = self.apply_demo_frame().await else {
                info!("Demo route finished");
                break;
            };
            ticks += 1;
            info!(
                "Demo waypoint {} ({}): traffic={} weather={}",
                frame.index, frame.waypoint.label, frame.waypoint.traffic, frame.waypoint.weather
            );

            if let Err(e) = self.refresh_playlist(false).await {
                warn!("Demo tick {} kept the previous playlist: {e}", frame.index);
            }

            let s = self.state.lock().await;
            if s.ended {
                break;
            }
            on_update(&*s);
        }

        ticks
    }

    /// Move the demo to its next waypoint. `None` when the script is done.
    async fn apply_demo_frame(&self) -> Option<DemoFrame> {
        let mut s = self.state.lock().await;
        if s.ended {
            return None;
        }
        let frame = s.demo.as_mut()?.next()?;

        s.position = Some(frame.waypoint.position);
        s.set_conditions(frame.waypoint.conditions());
        if frame.advance_step && s.current_step_index + 1 < s.steps.len() {
            s.current_step_index += 1;
        }
        if let Some(step) = s.steps.get(s.current_step_index) {
            s.distance_to_next_maneuver = frame.waypoint.position.distance_to(&step.location).ok();
        }
        Some(frame)
    }

    /// Re-derive the vibe from the current conditions.
    ///
    /// The vibe is otherwise fixed for the whole trip. Returns the new vibe;
    /// the next playlist request uses it. An ended trip keeps its vibe.
    pub async fn reset_vibe(&self) -> Vibe {
        let mut s = self.state.lock().await;
        if s.ended {
            return s.vibe;
        }
        s.vibe = select_vibe(s.declared_mood, &s.conditions);
        info!("Vibe reset to {}", s.vibe);
        s.vibe
    }

    async fn record_current(&self, action: FeedbackAction) -> Option<TrackCandidate> {
        let (track, ctx) = {
            let s = self.state.lock().await;
            (s.current_track().cloned()?, s.feedback_context())
        };
        self.learner
            .record_feedback_blocking(&self.user, FeedbackEvent::track_action(&track, action, &ctx))
            .await;
        Some(track)
    }

    /// Skip to the next track, recording the skip. Returns the new current track.
    ///
    /// The skip applies to the playlist that was current when it was read,
    /// so a refresh landing during the feedback write starts from its top.
    pub async fn next(&self) -> Option<TrackCandidate> {
        let (skipped, ctx, now_playing) = {
            let mut s = self.state.lock().await;
            let skipped = s.current_track().cloned()?;
            if s.current_track_index + 1 < s.playlist.len() {
                s.current_track_index += 1;
                s.songs_started += 1;
            }
            debug!("Skipped {} on playlist #{}", skipped.id, s.latest_seq);
            (skipped, s.feedback_context(), s.current_track().cloned())
        };
        self.learner
            .record_feedback_blocking(&self.user, FeedbackEvent::track_action(&skipped, FeedbackAction::Skipped, &ctx))
            .await;
        now_playing
    }

    /// Go back one track
    pub async fn previous(&self) -> Option<TrackCandidate> {
        let mut s = self.state.lock().await;
        s.current_track_index = s.current_track_index.saturating_sub(1);
        s.current_track().cloned()
    }

    /// Mark the current track as loved
    pub async fn love(&self) -> Option<TrackCandidate> {
        self.record_current(FeedbackAction::Loved).await
    }

    /// Mark the current track as a bad fit for the moment
    pub async fn bad_fit(&self) -> Option<TrackCandidate> {
        self.record_current(FeedbackAction::BadFit).await
    }

    /// End the trip, optionally with a rating. Later calls do nothing.
    pub async fn end(&self, rating: Option<TripRating>) {
        let ctx = {
            let mut s = self.state.lock().await;
            if s.ended {
                return;
            }
            s.ended = true;
            s.demo = None;
            s.feedback_context()
        };
        self.cancel.cancel();
        info!("Trip ended");

        if let Some(rating) = rating {
            self.learner.record_feedback_blocking(&self.user, FeedbackEvent::trip_rating(rating, &ctx)).await;
        }
    }
}
