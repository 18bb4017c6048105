//! # Preference Learning
//!
//! Listener feedback is recorded as [`FeedbackEvent`]s in an append-only store
//! and compressed on demand into a [`PreferenceSummary`]: a few plain
//! sentences handed to the recommender as advisory context.
//!
//! ## Signals
//!
//! Track actions are bucketed by the conditions recorded with them:
//!
//! | Bucket | When | Counted |
//! |--------|------|---------|
//! | rain | weather is Rain, Drizzle or Thunderstorm | loved vs skipped + bad fit |
//! | congested focus | heavy/severe traffic and vibe `focus` | loved vs skipped + bad fit |
//! | open-road energy | Clear/Clouds and vibe `hype` or `energetic` | loved only |
//!
//! The first two speak once they hold 3 events and one side leads; the third
//! once it has 2 loves. Trip ratings speak once there are 3 of them.
//!
//! Nothing is cached. Every [`PreferenceLearner::summarize`] call reads the
//! whole history again.

use crate::conditions::{TrafficLevel, WeatherCondition};
use crate::db::FeedbackStore;
use crate::error::{TripError, TripResult};
use crate::track::TrackCandidate;
use crate::vibe::{Mood, Vibe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// What the listener did to a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Skipped,
    Loved,
    BadFit,
}

impl FeedbackAction {
    /// Skipped or bad fit
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::Skipped | Self::BadFit)
    }
}

impl FromStr for FeedbackAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "skipped" | "skip" => Ok(Self::Skipped),
            "loved" | "love" => Ok(Self::Loved),
            "bad_fit" => Ok(Self::BadFit),
            _ => Err(format!("Unknown track action: {s}. Expected skipped, loved or bad-fit")),
        }
    }
}

/// Whole-trip verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripRating {
    Great,
    Meh,
    Bad,
}

impl FromStr for TripRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "great" => Ok(Self::Great),
            "meh" => Ok(Self::Meh),
            "bad" => Ok(Self::Bad),
            _ => Err(format!("Unknown trip rating: {s}. Expected great, meh or bad")),
        }
    }
}

/// Trip state recorded alongside every event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackContext {
    pub mood: Mood,
    pub vibe: Vibe,
    pub weather_condition: WeatherCondition,
    pub traffic_level: TrafficLevel,
}

/// One entry in a listener's feedback log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackEvent {
    TrackAction {
        track_id: String,
        #[serde(default)]
        track_name: String,
        #[serde(default)]
        artist: String,
        action: FeedbackAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mood: Option<Mood>,
        vibe: Vibe,
        weather_condition: WeatherCondition,
        traffic_level: TrafficLevel,
        created_at: DateTime<Utc>,
    },
    TripRating {
        rating: TripRating,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mood: Option<Mood>,
        vibe: Vibe,
        weather_condition: WeatherCondition,
        traffic_level: TrafficLevel,
        created_at: DateTime<Utc>,
    },
}

impl FeedbackEvent {
    #[must_use]
    pub fn track_action(track: &TrackCandidate, action: FeedbackAction, ctx: &FeedbackContext) -> Self {
        Self::TrackAction {
            track_id: track.id.clone(),
            track_name: track.name.clone(),
            artist: track.artist.clone(),
            action,
            mood: Some(ctx.mood),
            vibe: ctx.vibe,
            weather_condition: ctx.weather_condition,
            traffic_level: ctx.traffic_level,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn trip_rating(rating: TripRating, ctx: &FeedbackContext) -> Self {
        Self::TripRating {
            rating,
            mood: Some(ctx.mood),
            vibe: ctx.vibe,
            weather_condition: ctx.weather_condition,
            traffic_level: ctx.traffic_level,
            created_at: Utc::now(),
        }
    }

    /// Serialized `type` tag
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TrackAction { .. } => "track_action",
            Self::TripRating { .. } => "trip_rating",
        }
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::TrackAction { created_at, .. } | Self::TripRating { created_at, .. } => *created_at,
        }
    }
}

/// Derived advice, one sentence per line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceSummary {
    pub lines: Vec<String>,
}

impl PreferenceSummary {
    /// Lines joined for embedding in a prompt
    #[must_use]
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for PreferenceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

pub const NO_FEEDBACK_LINE: &str = "- No explicit feedback yet. Use general good-driving-music defaults.";
pub const NO_PATTERN_LINE: &str =
    "- No strong patterns detected yet; use general good-driving-music defaults and balanced choices.";

const RAIN_SKIPS_LINE: &str =
    "- In rainy conditions, user often skips or marks tracks as bad fit; avoid overly mellow or sleepy rain music.";
const RAIN_LOVES_LINE: &str =
    "- In rainy conditions, user enjoys cozy / mellow tracks; leaning into chill rain vibes is okay.";
const FOCUS_SKIPS_LINE: &str = "- In heavy traffic with focus vibe, user often dislikes the music; try slightly more uplifting but still non-stressful tracks.";
const FOCUS_LOVES_LINE: &str = "- In heavy traffic with focus vibe, current calm / focus style works well; keep similar low-distraction tracks.";
const OPEN_ROAD_LINE: &str = "- In clear weather with hype/energetic vibe, user tends to love energetic tracks; high-energy songs are a good choice here.";
const TRIPS_GREAT_LINE: &str = "- Overall, trips are often rated great; current strategy is mostly good, so only subtle adjustments are needed.";
const TRIPS_BAD_LINE: &str = "- User often rates trips as bad; be conservative, avoid extreme genre shifts, and stay closer to safe, widely-liked tracks.";
const TRIPS_MEH_LINE: &str =
    "- Many trips are rated as \"meh\"; increase variety within the chosen vibe so playlists feel less repetitive.";

#[derive(Debug, Default)]
struct Tally {
    loved: u32,
    disliked: u32,
}

impl Tally {
    fn count(&mut self, action: FeedbackAction) {
        match action.is_negative() {
            true => self.disliked += 1,
            false => self.loved += 1,
        }
    }

    /// Line for whichever side leads, once there are `min_events`
    fn verdict(&self, min_events: u32, disliked_line: &'static str, loved_line: &'static str) -> Option<&'static str> {
        if self.loved + self.disliked < min_events {
            return None;
        }
        match self.disliked.cmp(&self.loved) {
            std::cmp::Ordering::Greater => Some(disliked_line),
            std::cmp::Ordering::Less => Some(loved_line),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Compress a full feedback history into advice.
#[must_use]
pub fn summarize_events(events: &[FeedbackEvent]) -> PreferenceSummary {
    if events.is_empty() {
        return PreferenceSummary { lines: vec![NO_FEEDBACK_LINE.to_string()] };
    }

    let mut rain = Tally::default();
    let mut congested_focus = Tally::default();
    let mut open_road_loves = 0u32;
    let (mut great, mut meh, mut bad) = (0u32, 0u32, 0u32);

    for event in events {
        match event {
            FeedbackEvent::TrackAction { action, vibe, weather_condition, traffic_level, .. } => {
                if weather_condition.is_rain_family() {
                    rain.count(*action);
                }
                if traffic_level.is_congested() && *vibe == Vibe::Focus {
                    congested_focus.count(*action);
                }
                if weather_condition.is_clearish() && vibe.is_high_energy() && *action == FeedbackAction::Loved {
                    open_road_loves += 1;
                }
            }
            FeedbackEvent::TripRating { rating, .. } => match rating {
                TripRating::Great => great += 1,
                TripRating::Meh => meh += 1,
                TripRating::Bad => bad += 1,
            },
        }
    }

    let mut lines: Vec<&'static str> = Vec::new();
    lines.extend(rain.verdict(3, RAIN_SKIPS_LINE, RAIN_LOVES_LINE));
    lines.extend(congested_focus.verdict(3, FOCUS_SKIPS_LINE, FOCUS_LOVES_LINE));
    if open_road_loves >= 2 {
        lines.push(OPEN_ROAD_LINE);
    }

    if great + meh + bad >= 3 {
        if great >= bad + 2 {
            lines.push(TRIPS_GREAT_LINE);
        } else if bad > great {
            lines.push(TRIPS_BAD_LINE);
        } else if meh > great && meh > bad {
            lines.push(TRIPS_MEH_LINE);
        }
    }

    if lines.is_empty() {
        lines.push(NO_PATTERN_LINE);
    }

    PreferenceSummary { lines: lines.into_iter().map(str::to_string).collect() }
}

/// Records feedback and summarizes it per user
#[derive(Clone)]
pub struct PreferenceLearner {
    store: Arc<dyn FeedbackStore>,
}

impl fmt::Debug for PreferenceLearner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceLearner").finish_non_exhaustive()
    }
}

impl PreferenceLearner {
    #[must_use]
    pub fn new(store: Arc<dyn FeedbackStore>) -> Self {
        Self { store }
    }

    /// Append `event` to `user`'s log.
    ///
    /// # Errors
    ///
    /// [`TripError::FeedbackWrite`] when the store rejects the write.
    pub fn try_record(&self, user: &str, event: &FeedbackEvent) -> TripResult<()> {
        if user.trim().is_empty() {
            log::warn!("Feedback recorded without a username, skipping");
            return Ok(());
        }
        self.store
            .append(user, event)
            .map_err(|e| TripError::FeedbackWrite(format!("{e:#}")))
    }

    /// Append `event`, logging instead of failing. Playback never depends on it.
    pub fn record_feedback(&self, user: &str, event: &FeedbackEvent) {
        match self.try_record(user, event) {
            Ok(()) => log::debug!("Recorded {} for {user}", event.kind()),
            Err(e) => log::warn!("{e}"),
        }
    }

    /// Recompute the summary from `user`'s full history.
    #[must_use]
    pub fn summarize(&self, user: &str) -> PreferenceSummary {
        if user.trim().is_empty() {
            return summarize_events(&[]);
        }
        let history = self.store.history(user).unwrap_or_else(|e| {
            log::warn!("Could not read feedback for {user}: {e:#}");
            Vec::new()
        });
        summarize_events(&history)
    }

    /// [`Self::record_feedback`] on tokio's blocking pool
    pub async fn record_feedback_blocking(&self, user: &str, event: FeedbackEvent) {
        let learner = self.clone();
        let user = user.to_string();
        if let Err(e) = tokio::task::spawn_blocking(move || learner.record_feedback(&user, &event)).await {
            log::warn!("Feedback write task failed: {e}");
        }
    }

    /// [`Self::summarize`] on tokio's blocking pool
    pub async fn summarize_blocking(&self, user: &str) -> PreferenceSummary {
        let learner = self.clone();
        let user = user.to_string();
        tokio::task::spawn_blocking(move || learner.summarize(&user))
            .await
            .unwrap_or_else(|e| {
                log::warn!("Feedback read task failed: {e}");
                summarize_events(&[])
            })
    }
}
