//! # Command-Line Interface Module
//!
//! Clap definitions for the `vibenav` binary plus the text rendering used
//! while a demo trip runs.
//!
//! ## Commands
//!
//! - `demo`: Drive the scripted trip and print every update
//! - `vibe`: Show which vibe a mood turns into under given conditions
//! - `feedback track` / `feedback trip`: Append to a listener's feedback log
//! - `summary`: Print the learned preference summary for a listener
//! - `traffic`: Reduce congestion samples to a traffic level
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! vibenav demo --mood chill --user sam
//! vibenav vibe --mood happy --weather rain --traffic light
//! vibenav feedback track --user sam --track-id 4 --action bad-fit --vibe calm --weather rain
//! vibenav summary --user sam
//! ```

use crate::conditions::{CongestionLevel, TrafficLevel, WeatherCondition};
use crate::feedback::{FeedbackAction, TripRating};
use crate::geo::format_distance;
use crate::session::TripSession;
use crate::vibe::Vibe;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser)]
#[command(name = "vibenav")]
#[command(about = "VibeNav: trip-aware playlists that follow your mood, the weather and the traffic")]
#[command(version)]
pub struct Args {
    /// Engine config file
    ///
    /// Defaults to config.json in the vibenav data directory. Missing fields
    /// keep their built-in values.
    #[arg(long, global = true, env = "VIBENAV_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Run the scripted demo trip
    ///
    /// Drives 16 waypoints from West Towne Mall to Union South, changing
    /// weather and traffic along the way, and prints the playlist state after
    /// every tick. Press Ctrl-C to end the trip early.
    Demo {
        /// Declared mood for the trip
        #[arg(short, long, default_value = "chill")]
        mood: Vibe,

        /// Listener whose feedback log is used
        #[arg(short, long, default_value = "driver")]
        user: String,

        /// Milliseconds between waypoints (overrides the config file)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// JSON array of tracks to use instead of the sample library
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        tracks: Option<PathBuf>,

        /// Rate the trip when it finishes
        #[arg(long)]
        rating: Option<TripRating>,
    },

    /// Show the vibe a mood becomes under the given conditions
    Vibe {
        /// Declared mood
        #[arg(short, long)]
        mood: Vibe,

        /// Weather condition (clear, clouds, rain, drizzle, ...)
        #[arg(short, long, default_value = "unknown")]
        weather: WeatherCondition,

        /// Traffic level (smooth, light, moderate, heavy, severe)
        #[arg(short, long, default_value = "unknown")]
        traffic: TrafficLevel,
    },

    /// Append to a listener's feedback log
    Feedback {
        #[command(subcommand)]
        action: FeedbackCommand,
    },

    /// Print the learned preference summary for a listener
    Summary {
        #[arg(short, long)]
        user: String,
    },

    /// Derive a traffic level from congestion samples
    ///
    /// Each sample is one of: low, moderate, heavy, severe, unknown.
    Traffic {
        #[arg(required = true, num_args = 1..)]
        samples: Vec<CongestionLevel>,
    },

    /// Generate shell completions
    ///
    /// Usage: vibenav completion bash > ~/.local/share/bash-completion/completions/vibenav
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// Generate fish completions that also complete mood names
    ///
    /// Usage: vibenav completion-enhanced fish > ~/.config/fish/completions/vibenav.fish
    CompletionEnhanced {
        /// Shell to generate enhanced completions for (currently fish only)
        shell: Shell,
    },

    /// List mood names for completion (hidden command)
    #[command(hide = true)]
    CompleteMoods,
}

/// Feedback subcommands
#[derive(Subcommand, Debug)]
pub enum FeedbackCommand {
    /// Record what the listener did with one track
    Track {
        #[arg(short, long)]
        user: String,

        #[arg(long)]
        track_id: String,

        #[arg(long, default_value = "")]
        track_name: String,

        #[arg(long, default_value = "")]
        artist: String,

        /// skipped, loved or bad-fit
        #[arg(short, long)]
        action: FeedbackAction,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Rate a whole trip
    Trip {
        #[arg(short, long)]
        user: String,

        /// great, meh or bad
        #[arg(short, long)]
        rating: TripRating,

        #[command(flatten)]
        context: ContextArgs,
    },
}

/// Trip state attached to a feedback event
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct ContextArgs {
    /// Vibe that was playing
    #[arg(long)]
    pub vibe: Vibe,

    /// Declared mood, defaults to the vibe
    #[arg(long)]
    pub mood: Option<Vibe>,

    #[arg(long, default_value = "unknown")]
    pub weather: WeatherCondition,

    #[arg(long, default_value = "unknown")]
    pub traffic: TrafficLevel,
}

/// One-line view of a running trip
#[must_use]
pub fn status_line(session: &TripSession) -> String {
    let step = match session.current_step() {
        Some(step) => format!(
            "step {}/{} {}{}",
            session.current_step_index + 1,
            session.steps.len(),
            step.instruction_text,
            session
                .distance_to_next_maneuver
                .map(|d| format!(" in {}", format_distance(d)))
                .unwrap_or_default()
        ),
        None => "no route".to_string(),
    };

    let track = match session.current_track() {
        Some(track) => format!(
            "{} - {} ({}/{})",
            track.name,
            track.artist,
            session.current_track_index + 1,
            session.playlist.len()
        ),
        None => "nothing queued".to_string(),
    };

    format!(
        "{step} | {} {} | traffic {} | vibe {} | {track}",
        session.conditions.weather_condition,
        session.conditions.temperature_label(),
        session.conditions.traffic_level,
        session.vibe
    )
}
