//! Trip-aware playlist engine.
//!
//! VibeNav keeps a playlist in step with a drive: the listener declares a
//! mood, the weather and traffic along the route can override it, and a
//! pluggable recommender picks tracks from the listener's library. Feedback
//! given during trips is summarized and fed back into later requests.
//!
//! Core modules:
//! - [`session`] - Trip state, live and demo drivers, playlist refresh ordering
//! - [`playlist`] - Request construction, reply validation and padding
//! - [`recommender`] - The recommender seam and the offline feature scorer
//! - [`rules`] - Audio-feature hints, sequencing policy, prompt rendering
//! - [`vibe`] - Mood to vibe selection under current conditions
//! - [`geo`] - Distances and maneuver progress
//! - [`feedback`] - Feedback events and the preference learner
//!
//! ### Supporting Modules
//!
//! - [`conditions`] - Weather, traffic and congestion analysis
//! - [`track`] - Track candidates and the sample library
//! - [`db`] - Feedback storage (SQLite or in-memory)
//! - [`demo`] - The scripted demo drive
//! - [`providers`] - Location, routing, weather and catalog collaborators
//! - [`config`] - Data directory and engine tunables
//! - [`error`] - Error types
//! - [`cli`] / [`completion`] - Command line definitions and shell completions
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vibenav::config::EngineConfig;
//! use vibenav::db::MemoryFeedbackStore;
//! use vibenav::providers::StaticCatalog;
//! use vibenav::recommender::FeatureRecommender;
//! use vibenav::session::TripEngine;
//! use vibenav::vibe::Vibe;
//!
//! # async fn run() {
//! let engine = TripEngine::new(
//!     Arc::new(FeatureRecommender),
//!     Arc::new(MemoryFeedbackStore::new()),
//!     EngineConfig::default(),
//! );
//! let trip = engine.start_demo(&StaticCatalog::default(), Vibe::Chill, "sam").await;
//! let ticks = trip.run_demo(|s| println!("{} -> {:?}", s.vibe, s.current_track())).await;
//! println!("{ticks} demo ticks");
//! # }
//! ```
//!
//! ## Vibe Selection
//!
//! First match wins:
//! 1. rain or drizzle: `calm`
//! 2. heavy or severe traffic: `focus`
//! 3. clear sky with light or smooth traffic: `hype`
//! 4. otherwise the declared mood
//!
//! The vibe is chosen once per trip. Later condition changes shape the hints
//! sent with each request, not the vibe.
//!
//! ## Sequencing
//!
//! The first three songs of a trip are picked on vibe alone. From the fourth
//! song on, requests carry the current weather and traffic as well.
//!
//! ## Error Handling
//!
//! Engine operations return typed errors from [`error`]. Glue code (config,
//! storage, CLI) uses `anyhow::Result`. Recommender failures and feedback
//! write failures never stop a trip: the playlist is padded from the pool and
//! the failed write is logged.

pub mod cli;
pub mod completion;
pub mod conditions;
pub mod config;
pub mod db;
pub mod demo;
pub mod error;
pub mod feedback;
pub mod geo;
pub mod playlist;
pub mod providers;
pub mod recommender;
pub mod rules;
pub mod session;
pub mod track;
pub mod vibe;
